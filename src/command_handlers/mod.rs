pub mod dispatch;
pub mod install;
pub mod uninstall;
