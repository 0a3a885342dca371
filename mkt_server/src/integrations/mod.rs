mod email;

pub use email::HttpEmailNotifier;
