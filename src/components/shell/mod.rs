pub use dashboard::{Dashboard, DashboardExit};
pub use guard::Screen;
pub use login::{LoginExit, LoginScreen};
pub use terminal::Terminal;

pub mod dashboard;
pub mod guard;
pub mod login;
pub mod terminal;
