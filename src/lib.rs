//! Fragment-to-component compiler.
//!
//! Takes a bare JSX fragment, no wrapper required, and synthesizes a
//! complete CommonJS component module around it: dependencies are resolved
//! from its explicit imports and the request's injected globals, markup is
//! lowered to runtime element-factory calls, and the wrapper comes out
//! stateless or stateful depending on whether the fragment touches
//! component state. Compilation is deterministic, so artifacts are
//! memoized in a concurrent cache keyed by source and globals.

use std::collections::BTreeMap;
use std::sync::Arc;

use oxc_allocator::Allocator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

mod cache;
mod classify;
mod emit;
mod error;
mod lower;
mod parse;
mod rename;
mod resolve;
mod scope;


pub use cache::ArtifactCache;
pub use classify::ComponentKind;
pub use error::CompileError;
pub use resolve::{Dependency, ImportBinding, ImportedSymbol, Resolution};

use rename::ReservedAliases;

/// Compiler-wide settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Name given to the synthesized component function or class.
    pub component_name: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            component_name: "Component".to_string(),
        }
    }
}

/// Per-request settings supplied alongside a fragment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub opts: RequestOpts,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOpts {
    /// Values injected into the module scope for free identifiers the
    /// fragment never imports.
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
}

/// A compiled component module plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledArtifact {
    /// Complete CommonJS module text.
    pub buffer: String,
    pub meta: ArtifactMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMeta {
    /// Normalized package names of the fragment's explicit imports, in
    /// declaration order, deduplicated.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Compiler {
    config: CompilerConfig,
    cache: ArtifactCache,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            cache: ArtifactCache::new(),
        }
    }

    /// Compiles a fragment into a component module, serving repeat
    /// requests from the artifact cache.
    pub async fn compile(
        &self,
        source: &str,
        path: &str,
        request: Option<&RequestConfig>,
    ) -> Result<Arc<CompiledArtifact>, CompileError> {
        let key = ArtifactCache::key(source, request);
        if let Some(artifact) = self.cache.get(&key) {
            trace!(path, "serving compiled artifact from cache");
            return Ok(artifact);
        }

        let artifact = self.compile_fragment(source, path, request)?;
        Ok(self.cache.insert(key, Arc::new(artifact)))
    }

    fn compile_fragment(
        &self,
        source: &str,
        path: &str,
        request: Option<&RequestConfig>,
    ) -> Result<CompiledArtifact, CompileError> {
        let allocator = Allocator::default();
        let mut program = parse::parse_fragment(&allocator, source, path)?;

        let scope = scope::analyze(&program);
        let dependencies = resolve::collect_imports(&program);

        let resolutions = resolve::resolve_free(
            &scope,
            &dependencies,
            request.map(|r| &r.opts.globals),
        );
        let globals: Vec<(String, Value)> = resolutions
            .into_iter()
            .filter_map(|(name, resolution)| match resolution {
                Resolution::InjectedGlobal { value } => Some((name, value)),
                _ => None,
            })
            .collect();

        // A fragment that already carries a component is exported as-is
        // instead of being wrapped in a synthesized shape.
        if lower::preformed_component(&program) {
            let component = lower::lower_preformed(&allocator, &mut program);
            debug!(
                path,
                dependencies = dependencies.len(),
                "exporting pre-formed component"
            );
            let buffer = emit::synthesize_preformed(&dependencies, &globals, &component);
            return Ok(CompiledArtifact {
                buffer,
                meta: ArtifactMeta {
                    dependencies: dependencies.into_iter().map(|d| d.source).collect(),
                },
            });
        }

        let kind = classify::component_kind(&program);
        let aliases = ReservedAliases::for_fragment(&scope);
        let lowered = lower::lower_program(&allocator, &mut program, &aliases);
        let needs_ambient = lowered.ambient_accessed
            || scope.free.iter().any(|name| name == rename::AMBIENT_CONTEXT);

        debug!(
            path,
            ?kind,
            dependencies = dependencies.len(),
            globals = globals.len(),
            "synthesizing component module"
        );

        let buffer = emit::synthesize(&emit::Synthesis {
            component_name: &self.config.component_name,
            kind,
            aliases: &aliases,
            dependencies: &dependencies,
            globals,
            lowered: &lowered,
            needs_ambient,
        });

        Ok(CompiledArtifact {
            buffer,
            meta: ArtifactMeta {
                dependencies: dependencies.into_iter().map(|d| d.source).collect(),
            },
        })
    }
}
