pub mod evidence;
pub mod leave_approval;
pub mod leave_policy;
pub mod leave_request;
pub mod notification;
pub mod profile;
