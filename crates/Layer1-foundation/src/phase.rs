//! Generation phases
//!
//! 생성은 항상 backend → frontend 순서로 두 단계만 진행된다.

use serde::{Deserialize, Serialize};

/// One of the two top-level generation stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Backend,
    Frontend,
}

impl Phase {
    /// All phases in execution order
    pub const ORDER: [Phase; 2] = [Phase::Backend, Phase::Frontend];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
