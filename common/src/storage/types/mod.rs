pub mod reference_question;
pub mod session;
