//! tide-vars — content-addressed variable lifecycle.
//!
//! Turns secret and config declarations into immutable, versioned cluster
//! objects and cleans up the versions that are no longer referenced.
//!
//! # Components
//!
//! - **`env`** — builds the layered `VariableEnvironment` from settings
//! - **`source`** — which source a declaration reads its content from
//! - **`codec`** — encode/decode directives (base64, base64url, hex, url)
//! - **`lifecycle`** — resolve, hash, name and materialize one declaration
//! - **`reconcile`** — resolve a whole stack spec
//! - **`gc`** — prune superseded and unlabeled versions from the cluster
//!
//! # Naming
//!
//! A materialized variable is named `{base}-{sha256(trim(content))[:7]}`,
//! so unchanged content keeps its name across runs and any change rotates
//! it to a new object.

pub mod codec;
pub mod env;
pub mod error;
pub mod gc;
pub mod lifecycle;
pub mod reconcile;
pub mod source;

pub use codec::{Codec, Transform};
pub use env::build_environment;
pub use error::{VariableError, VariableResult};
pub use gc::{
    identity_set, prune, GarbageCollector, PruneReason, PruneReport, PrunedItem, RotationNotice,
    ROTATION_THRESHOLD_DAYS,
};
pub use lifecycle::{content_hash, Resolution, VariableManager, GENERATED_SUFFIX};
pub use reconcile::reconcile;
pub use source::VariableSource;
