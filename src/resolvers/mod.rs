//! Built-in platform resolvers. Adding a platform means writing one module
//! with a `spec()` and registering it here; the dispatch engine is untouched.

pub mod bilibili;
pub mod douyin;
pub mod twitter;

pub use bilibili::BilibiliResolver;
pub use douyin::DouyinResolver;
pub use twitter::TwitterResolver;

use crate::{RegistryBuilder, ResolveError, ResolverRegistry};

/// Registry with every built-in platform. Registration order fixes match
/// precedence.
pub fn builtin_registry() -> Result<ResolverRegistry, ResolveError> {
    Ok(RegistryBuilder::new()
        .register(bilibili::spec())?
        .register(douyin::spec())?
        .register(twitter::spec())?
        .build())
}
