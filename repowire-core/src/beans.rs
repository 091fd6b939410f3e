use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

// ── Traits ──────────────────────────────────────────────────────────────────

/// A type the [`BeanRegistry`] can construct from already-resolved beans.
///
/// Repositories are the typical bean: they depend on the shared manager
/// registry and fail to build when their entity declaration is malformed.
/// Construction failures surface from [`BeanRegistry::resolve`] instead of
/// panicking at first use.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not registered as a Bean",
    label = "this type is not a bean",
    note = "add `#[derive(EntityRepository)]` to your repository or implement the `Bean` trait manually"
)]
pub trait Bean: Clone + Send + Sync + 'static {
    /// [`TypeId`]s and type names of every bean this one is built from.
    fn dependencies() -> Vec<(TypeId, &'static str)>;

    /// Construct the bean from a context holding all of its dependencies.
    fn build(ctx: &BeanContext) -> Result<Self, BeanError>;
}

/// Asynchronous factory for types you don't own (connection pools, shared
/// registries built from configuration, ...).
///
/// Register with [`BeanRegistry::register_producer`]; the output is stored
/// under `Self::Output`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not registered as a Producer",
    label = "this type is not a producer",
    note = "implement `Producer` with the type it should create as `Output`"
)]
pub trait Producer: Send + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn dependencies() -> Vec<(TypeId, &'static str)>;

    fn produce(ctx: &BeanContext)
        -> impl Future<Output = Result<Self::Output, BeanError>> + Send + '_;
}

// ── BeanContext ─────────────────────────────────────────────────────────────

/// Read-only container of resolved bean instances, keyed by [`TypeId`].
pub struct BeanContext {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContext")
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl BeanContext {
    /// Clone a bean out of the context.
    ///
    /// # Errors
    ///
    /// [`BeanError::MissingDependency`] if `T` was neither provided nor built.
    pub fn get<T: Clone + 'static>(&self) -> Result<T, BeanError> {
        self.try_get::<T>()
            .ok_or_else(|| BeanError::MissingDependency {
                bean: "<context>".to_string(),
                dependency: type_name::<T>().to_string(),
            })
    }

    /// Clone a bean out of the context, or `None` if it is absent.
    pub fn try_get<T: Clone + 'static>(&self) -> Option<T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── BeanRegistry ────────────────────────────────────────────────────────────

type Built = Result<Box<dyn Any + Send + Sync>, BeanError>;

/// Takes the context by value and hands it back with the built bean, so the
/// future owns everything it borrows.
type Factory =
    Box<dyn FnOnce(BeanContext) -> Pin<Box<dyn Future<Output = (BeanContext, Built)> + Send>> + Send>;

/// Collects bean registrations and provided instances, orders them by
/// dependency and builds a [`BeanContext`].
pub struct BeanRegistry {
    beans: Vec<BeanRegistration>,
    provided: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

struct BeanRegistration {
    type_id: TypeId,
    type_name: &'static str,
    dependencies: Vec<(TypeId, &'static str)>,
    factory: Factory,
}

/// Errors raised while wiring beans.
#[derive(Debug)]
pub enum BeanError {
    /// A dependency cycle was detected.
    CyclicDependency { cycle: Vec<String> },
    /// A bean declares a dependency that is neither registered nor provided.
    MissingDependency { bean: String, dependency: String },
    /// The same type was registered more than once.
    DuplicateBean { type_name: String },
    /// A bean or producer refused to build.
    Construction {
        bean: String,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BeanError {
    /// Wrap a construction failure of bean `B`.
    pub fn construction<B: ?Sized>(err: impl Error + Send + Sync + 'static) -> Self {
        BeanError::Construction {
            bean: type_name::<B>().to_string(),
            source: Box::new(err),
        }
    }
}

impl fmt::Display for BeanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeanError::CyclicDependency { cycle } => {
                write!(f, "Circular dependency detected: {}", cycle.join(" -> "))
            }
            BeanError::MissingDependency { bean, dependency } => write!(
                f,
                "Missing dependency for bean '{bean}': type '{dependency}' is not registered. \
                 Use .provide(instance), .register::<Type>() or .register_producer::<P>()"
            ),
            BeanError::DuplicateBean { type_name } => {
                write!(f, "Bean of type '{type_name}' registered twice")
            }
            BeanError::Construction { bean, source } => {
                write!(f, "Failed to build bean '{bean}': {source}")
            }
        }
    }
}

impl Error for BeanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BeanError::Construction { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self {
            beans: Vec::new(),
            provided: HashMap::new(),
        }
    }

    /// Provide a pre-built instance, available to beans depending on `T`.
    pub fn provide<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.provided.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    /// Register a bean type for construction during [`resolve`](Self::resolve).
    pub fn register<T: Bean>(&mut self) -> &mut Self {
        self.beans.push(BeanRegistration {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            dependencies: T::dependencies(),
            factory: Box::new(|ctx| {
                Box::pin(async move {
                    let built = T::build(&ctx).map(|bean| Box::new(bean) as Box<dyn Any + Send + Sync>);
                    (ctx, built)
                })
            }),
        });
        self
    }

    /// Register a producer; its output is stored under `P::Output`.
    pub fn register_producer<P: Producer>(&mut self) -> &mut Self {
        self.beans.push(BeanRegistration {
            type_id: TypeId::of::<P::Output>(),
            type_name: type_name::<P::Output>(),
            dependencies: P::dependencies(),
            factory: Box::new(|ctx| {
                Box::pin(async move {
                    let built = P::produce(&ctx)
                        .await
                        .map(|out| Box::new(out) as Box<dyn Any + Send + Sync>);
                    (ctx, built)
                })
            }),
        });
        self
    }

    /// Validate the graph and build every bean in dependency order
    /// (Kahn's algorithm).
    ///
    /// # Errors
    ///
    /// Duplicates, missing dependencies and cycles are reported before any
    /// bean is built; the first construction failure aborts resolution.
    pub async fn resolve(self) -> Result<BeanContext, BeanError> {
        let mut entries = self.provided;

        if self.beans.is_empty() {
            return Ok(BeanContext { entries });
        }

        Self::check_for_duplicates(&self.beans, &entries)?;
        let id_to_idx: HashMap<TypeId, usize> = self
            .beans
            .iter()
            .enumerate()
            .map(|(i, r)| (r.type_id, i))
            .collect();
        Self::check_missing_dependencies(&self.beans, &entries, &id_to_idx)?;
        let order = Self::topological_sort(&self.beans, &id_to_idx)?;

        let mut pending: Vec<Option<BeanRegistration>> = self.beans.into_iter().map(Some).collect();
        for idx in order {
            let Some(reg) = pending[idx].take() else {
                continue;
            };
            tracing::trace!(bean = reg.type_name, "building bean");
            let (ctx, built) = (reg.factory)(BeanContext { entries }).await;
            entries = ctx.entries;
            entries.insert(reg.type_id, built?);
        }

        Ok(BeanContext { entries })
    }

    fn check_for_duplicates(
        beans: &[BeanRegistration],
        entries: &HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    ) -> Result<(), BeanError> {
        let mut seen = HashMap::new();
        for reg in beans {
            if entries.contains_key(&reg.type_id) || seen.insert(reg.type_id, ()).is_some() {
                return Err(BeanError::DuplicateBean {
                    type_name: reg.type_name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_missing_dependencies(
        beans: &[BeanRegistration],
        entries: &HashMap<TypeId, Box<dyn Any + Send + Sync>>,
        id_to_idx: &HashMap<TypeId, usize>,
    ) -> Result<(), BeanError> {
        for reg in beans {
            for (dep_id, dep_name) in &reg.dependencies {
                if !entries.contains_key(dep_id) && !id_to_idx.contains_key(dep_id) {
                    return Err(BeanError::MissingDependency {
                        bean: reg.type_name.to_string(),
                        dependency: dep_name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn topological_sort(
        beans: &[BeanRegistration],
        id_to_idx: &HashMap<TypeId, usize>,
    ) -> Result<Vec<usize>, BeanError> {
        // Provided instances don't count towards the in-degree.
        let mut in_degree: Vec<usize> = beans
            .iter()
            .map(|reg| {
                reg.dependencies
                    .iter()
                    .filter(|(d, _)| id_to_idx.contains_key(d))
                    .count()
            })
            .collect();

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); beans.len()];
        for (i, reg) in beans.iter().enumerate() {
            for (dep_id, _) in &reg.dependencies {
                if let Some(&dep_idx) = id_to_idx.get(dep_id) {
                    dependents[dep_idx].push(i);
                }
            }
        }

        let mut queue: Vec<usize> = (0..beans.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(beans.len());

        while let Some(idx) = queue.pop() {
            sorted.push(idx);
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if sorted.len() != beans.len() {
            let cycle = (0..beans.len())
                .filter(|i| in_degree[*i] > 0)
                .map(|i| beans[i].type_name.to_string())
                .collect();
            return Err(BeanError::CyclicDependency { cycle });
        }

        Ok(sorted)
    }
}

impl Default for BeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}
