pub mod loader;
pub mod schema;

pub use loader::{load_dotenv, Settings};
pub use schema::{AttachmentFilter, Config, DriveCredentials, ImapSettings, MailCredentials};
