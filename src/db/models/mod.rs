pub mod approval;
pub mod evidence;
pub mod leave;
pub mod notification;
pub mod profile;
