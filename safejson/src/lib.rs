pub mod diagnose;
pub mod encode;
pub mod error;
pub mod load;
pub mod lock;
pub mod node;
pub mod save;

extern crate safejson_macro;
pub use safejson_macro::Record;

pub use diagnose::{Diagnoser, Report, find_unserializable, format_report};
pub use encode::{Encoder, ExtendedEncoder, StandardEncoder, Strict};
pub use error::{EncodeError, Error, LoadError, SaveError};
pub use load::Loader;
pub use lock::PathLocks;
pub use node::{Key, Node, ToRecord, to_node};
pub use save::{SaveOptions, Saver};

pub type LoadResult<T> = Result<T, error::LoadError>;
pub type SaveResult<T> = Result<T, error::SaveError>;
