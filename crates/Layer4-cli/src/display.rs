//! Generated files display

use std::collections::BTreeMap;
use std::path::Path;

/// 확장자(또는 dotfile 이름) 기준 분류
pub fn file_kind(path: &str) -> &'static str {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_lowercase();

    if name == "dockerfile" {
        return "Docker";
    }
    let ext = if name.starts_with('.') {
        name.as_str()
    } else {
        match name.rfind('.') {
            Some(idx) => &name[idx..],
            None => "",
        }
    };

    match ext {
        ".ts" => "TypeScript",
        ".tsx" | ".jsx" => "React",
        ".js" => "JavaScript",
        ".json" | ".yml" | ".yaml" | ".env" | ".npmrc" | ".nvmrc" | ".eslintrc"
        | ".prettierrc" => "Config",
        ".html" => "HTML",
        ".css" | ".scss" => "Styles",
        ".md" => "Documentation",
        ".dockerfile" | ".dockerignore" => "Docker",
        ".gitignore" => "Git",
        _ => "Other",
    }
}

/// kind → 정렬된 경로 목록 (kind도 정렬됨)
pub fn group_by_kind(files: &[String]) -> BTreeMap<&'static str, Vec<&str>> {
    let mut groups: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
    for file in files {
        groups.entry(file_kind(file)).or_default().push(file.as_str());
    }
    for paths in groups.values_mut() {
        paths.sort_unstable();
        paths.dedup();
    }
    groups
}

/// phase 하나의 생성 파일 표
pub fn render_files(category: &str, files: &[String]) -> Option<String> {
    if files.is_empty() {
        return None;
    }

    let groups = group_by_kind(files);
    let width = groups.keys().map(|k| k.len()).max().unwrap_or(0);

    let mut out = format!("\n📦 Generated {} Files:\n", category);
    for (kind, paths) in &groups {
        for (i, path) in paths.iter().enumerate() {
            let label = if i == 0 { *kind } else { "" };
            out.push_str(&format!("  {:<width$}  {}\n", label, path, width = width));
        }
    }
    Some(out)
}
