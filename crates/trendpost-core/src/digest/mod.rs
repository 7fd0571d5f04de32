mod template;

pub use template::{DigestMessage, DigestTemplate};
