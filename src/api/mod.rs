pub mod evidence;
pub mod health;
pub mod leave_approval;
pub mod leave_policy;
pub mod leave_request;
pub mod notification;
