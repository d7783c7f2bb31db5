pub mod callback_token;
pub mod dispatcher;
pub mod line;
pub mod stub;
pub mod twilio;
pub mod twiml;
