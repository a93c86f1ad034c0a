//! File materializer - 파일 목록을 프로젝트 디렉토리에 기록

use crate::error::MaterializeError;
use crate::payload::FileDescriptor;
use semiform_foundation::NOTES_FILE;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// `<destination>/<project>` 아래에만 쓰는 writer
#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
}

impl Materializer {
    pub fn new(destination: impl AsRef<Path>, project_name: &str) -> Self {
        Self {
            root: destination.as_ref().join(project_name),
        }
    }

    /// 이미 계산된 프로젝트 루트로 생성
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn notes_path(&self) -> PathBuf {
        self.root.join(NOTES_FILE)
    }

    /// 파일 하나 기록, 성공 시 루트 기준 상대 경로 반환
    ///
    /// NOTES.md는 지정된 폴더와 무관하게 루트에 씁니다. 같은 경로는 마지막 쓰기가 이깁니다.
    pub async fn write(&self, file: &FileDescriptor) -> Result<String, MaterializeError> {
        let relative = if file.filename == NOTES_FILE {
            NOTES_FILE.to_string()
        } else {
            file.relative_path()
        };
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MaterializeError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = file.content_text();
        tokio::fs::write(&target, content.as_bytes())
            .await
            .map_err(|source| MaterializeError::Io {
                path: target.clone(),
                source,
            })?;

        info!("Created file {}", target.display());
        debug!("{} ({} bytes)", relative, content.len());
        Ok(relative)
    }

    /// 상대 경로를 루트 아래 절대 경로로 (절대 경로, `..` 탈출은 거부)
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, MaterializeError> {
        let unsafe_path = |reason| MaterializeError::UnsafePath {
            path: relative.to_string(),
            reason,
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => return Err(unsafe_path("parent directory reference")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path("absolute path"))
                }
            }
        }

        if depth == 0 {
            return Err(unsafe_path("empty path"));
        }
        Ok(resolved)
    }

    /// 백엔드 phase가 남긴 NOTES.md (없으면 None)
    pub async fn read_notes(&self) -> Option<String> {
        tokio::fs::read_to_string(self.notes_path()).await.ok()
    }
}
