//! Phase instructions and seed messages
//!
//! 지시문 텍스트는 엔진 입장에서 불투명한 입력입니다. 여기에는 기본값만 둡니다.

use semiform_foundation::NOTES_FILE;

pub const GENERATE_BACKEND: &str = "Generate the backend service";
pub const GENERATE_FRONTEND: &str = "Generate the frontend service";
pub const BACKEND_ACK: &str = "I will first generate the backend service for you.";
pub const FRONTEND_ACK: &str = "Now I will generate the frontend service.";
pub const NOTES_HEADING: &str =
    "Here are some facts about the backend code that you should take into account:";

const SCHEMA_GUIDE: &str = "\
You are an AI assistant that generates complete source code from a high-level project model.
The model you receive is structured like an MVC application:

1. TechStack: the technologies to use. Add supporting dependencies where they add value.
2. Entities: tables or documents. Private entities are never exposed outside the database.
   Fields referencing another entity need proper key relations.
3. Components: reusable UI components. Attributes are text, style/layout hints or nested components.
4. Actions: operations components use (login, fetching data). They are served by the backend.
5. Roles: user types that change what controllers and pages show.
6. Pages: the top of the component hierarchy.

Analyze the model, plan the structure, then generate clean, documented, runnable code.
Every file must be emitted through the file creation tool.
";

const BACKEND_RULES: &str = "
All backend code goes in a \"backend\" folder and must run out of the box:
- Default to PostgreSQL (image postgres:14) when no database is specified and use Sequelize as ORM.
- Seed the database with mock data before the HTTP server starts.
- Provide a Dockerfile and a docker-compose.yml with healthchecks, networks and start dependencies.
- Ship a .env with PORT=3001, POSTGRES_HOST=postgres, POSTGRES_PORT=5432, POSTGRES_USER=postgres,
  POSTGRES_PASSWORD=postgres and POSTGRES_DB=postgres, and load it from docker-compose.yml.
- Implement every route and respect the entity names from the model.
- The backend listens on localhost:3001, the frontend will run on localhost:3000.
";

const FRONTEND_RULES: &str = "
All frontend code goes in a \"frontend\" folder. Generate every file from scratch, including
package.json, tsconfig.json, index.html, index.css, index.tsx, tailwind.config.js and App.tsx.
- Style with tailwindcss and use react-icons for icons; declare every dependency in package.json.
- Build reusable, well styled components and infer the design from the model.
- Do not generate reportWebVitals.
- The backend listens on localhost:3001, the frontend runs on localhost:3000.
";

/// Phase별 지시문과 acknowledgement 메시지
#[derive(Debug, Clone)]
pub struct PhasePrompts {
    pub backend_instructions: String,
    pub frontend_instructions: String,
    pub backend_ack: String,
    pub frontend_ack: String,
}

impl Default for PhasePrompts {
    fn default() -> Self {
        Self {
            backend_instructions: format!(
                "{}{}\nFinally, generate a file called `{}` with everything the frontend generator \
                 should know about this backend (API routes, payloads, ports).\n",
                SCHEMA_GUIDE, BACKEND_RULES, NOTES_FILE
            ),
            frontend_instructions: format!("{}{}", SCHEMA_GUIDE, FRONTEND_RULES),
            backend_ack: BACKEND_ACK.to_string(),
            frontend_ack: FRONTEND_ACK.to_string(),
        }
    }
}

impl PhasePrompts {
    /// notes가 있으면 고정 heading 아래에 그대로 붙임
    pub fn frontend_instructions_with(&self, notes: Option<&str>) -> String {
        match notes {
            Some(notes) => format!(
                "{}\n{}\n {}",
                self.frontend_instructions, NOTES_HEADING, notes
            ),
            None => self.frontend_instructions.clone(),
        }
    }
}

/// "Created the following files:" manifest 메시지
pub fn manifest_message(files: &[String]) -> String {
    let list = files
        .iter()
        .map(|f| format!("`{}`", f))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Created the following files:\n{}", list)
}
