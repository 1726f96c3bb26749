pub mod error;

pub use error::{
    Disposition, DispatchError, ErrorClassifier, ErrorKind, ProviderError, Result,
};
