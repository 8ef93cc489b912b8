/// Commands return result structs instead of printing them; main.rs renders
/// each as human-readable text or JSON depending on --json.
mod exec;
mod init;
mod run;

pub use exec::*;
pub use init::*;
pub use run::*;
