use std::{
    fmt::Debug,
    sync::{Arc, OnceLock, Weak},
};

use futures::{future::BoxFuture, FutureExt};
use stratum_di::{
    Constructible, InjectError, Injectable, Injector, Instance, Provider, Token, TypeInfo,
};

/// A unit declaring providers, imports and owned declarations
///
/// The module itself is constructed through its own injector once the application starts.
///
/// # Example
/// ```rust
/// use stratum::{Module, ModuleDescriptor};
/// use stratum_di::{Args, Constructible, DynError, InjectionToken, Provider};
///
/// static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
///
/// struct DbModule;
/// impl Constructible for DbModule {
///     fn construct(_: Args) -> Result<Self, DynError> {
///         Ok(DbModule)
///     }
/// }
///
/// impl Module for DbModule {
///     fn descriptor() -> Option<ModuleDescriptor> {
///         Some(ModuleDescriptor::new().add_provider(Provider::value(&DB_URL, "mem://")))
///     }
/// }
/// ```
pub trait Module: Constructible {
    /// The module metadata, `None` if the type cannot be used as module
    fn descriptor() -> Option<ModuleDescriptor>;
}

/// Type erased module type
#[derive(Clone, Copy)]
pub struct ModuleType {
    info: TypeInfo,
    describe: fn() -> Option<ModuleDescriptor>,
    instantiate: for<'a> fn(&'a Injector) -> BoxFuture<'a, Result<Instance, InjectError>>,
}

impl ModuleType {
    pub fn of<M: Module>() -> Self {
        ModuleType {
            info: TypeInfo::of::<M>(),
            describe: M::descriptor,
            instantiate: instantiate_erased::<M>,
        }
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub fn descriptor(&self) -> Option<ModuleDescriptor> {
        (self.describe)()
    }

    /// Constructs the module, resolving its dependencies from `injector`
    pub fn instantiate<'a>(
        &self,
        injector: &'a Injector,
    ) -> BoxFuture<'a, Result<Instance, InjectError>> {
        (self.instantiate)(injector)
    }
}

fn instantiate_erased<M: Module>(injector: &Injector) -> BoxFuture<'_, Result<Instance, InjectError>> {
    async move { injector.instantiate_async::<M>().await.map(Instance::new) }.boxed()
}

impl PartialEq for ModuleType {
    fn eq(&self, other: &Self) -> bool {
        self.info.type_id == other.info.type_id
    }
}
impl Eq for ModuleType {}

impl Debug for ModuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModuleType").field(&self.info.type_name).finish()
    }
}

/// An entry of a module's import list
#[derive(Clone, Debug)]
pub enum Import {
    Module(ModuleType),
    /// The module plus providers exposed to the importer next to the module's own
    WithProviders {
        module: ModuleType,
        providers: Vec<Provider>,
    },
}

impl Import {
    pub fn module_type(&self) -> ModuleType {
        match self {
            Import::Module(module) | Import::WithProviders { module, .. } => *module,
        }
    }

    pub fn extra_providers(&self) -> &[Provider] {
        match self {
            Import::Module(_) => &[],
            Import::WithProviders { providers, .. } => providers,
        }
    }
}

/// Module metadata
///
/// - `imports` are loaded as child modules; their providers become visible to this module
/// - `providers` are exposed to the importing module (or to this module, if it is the main one)
/// - `declarations` are types owned by this module
#[derive(Clone, Debug, Default)]
pub struct ModuleDescriptor {
    id: Option<&'static str>,
    imports: Vec<Import>,
    providers: Vec<Provider>,
    declarations: Vec<Token>,
}

impl ModuleDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an opaque id
    pub fn with_id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn add_import<M: Module>(mut self) -> Self {
        self.imports.push(Import::Module(ModuleType::of::<M>()));
        self
    }

    /// Imports `M` together with extra providers
    pub fn add_import_with<M: Module>(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.imports.push(Import::WithProviders {
            module: ModuleType::of::<M>(),
            providers: providers.into_iter().collect(),
        });
        self
    }

    pub fn add_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn add_providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn add_declaration<T: 'static + ?Sized>(mut self) -> Self {
        self.declarations.push(Token::of::<T>());
        self
    }

    pub fn id(&self) -> Option<&'static str> {
        self.id
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn declarations(&self) -> &[Token] {
        &self.declarations
    }
}

/// A loaded module: its type, metadata, injector and, once started, its instance
pub struct ModuleRef {
    module_type: ModuleType,
    descriptor: ModuleDescriptor,
    injector: Injector,
    instance: OnceLock<Instance>,
}

impl Debug for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRef")
            .field("module", &self.module_type.info.type_name)
            .field("id", &self.descriptor.id)
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}

impl ModuleRef {
    pub(crate) fn new(module_type: ModuleType, descriptor: ModuleDescriptor, injector: Injector) -> Self {
        ModuleRef {
            module_type,
            descriptor,
            injector,
            instance: OnceLock::new(),
        }
    }

    pub fn module_type(&self) -> ModuleType {
        self.module_type
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.get().is_some()
    }

    /// The module instance, `None` until the application started this module
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.get()
    }

    /// The module instance as `M`
    pub fn instance_of<M: Injectable>(&self) -> Option<Arc<M>> {
        self.instance.get().and_then(|instance| instance.downcast().ok())
    }

    /// Stores the instance, keeping the first one if called twice
    pub(crate) fn set_instance(&self, instance: Instance) {
        let _ = self.instance.set(instance);
    }
}

/// The module owning an injector
///
/// Every module injector provides a handle to its [ModuleRef] under `Token::of::<ModuleHandle>()`.
/// The handle does not keep the module alive.
#[derive(Clone, Default)]
pub struct ModuleHandle(Arc<OnceLock<Weak<ModuleRef>>>);

impl ModuleHandle {
    pub(crate) fn bind(&self, module: &Arc<ModuleRef>) {
        let _ = self.0.set(Arc::downgrade(module));
    }

    /// Returns the module, `None` if the application was dropped
    pub fn get(&self) -> Option<Arc<ModuleRef>> {
        self.0.get().and_then(Weak::upgrade)
    }
}

impl Debug for ModuleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let module = self.get().map(|module| module.module_type.info.type_name);
        f.debug_tuple("ModuleHandle").field(&module).finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use stratum_di::{Args, DependencyInfo, DynError, InjectionToken};

    use super::*;

    static NAME: InjectionToken = InjectionToken::new("NAME");

    struct Named(Arc<String>);
    impl Constructible for Named {
        fn dependencies() -> Vec<DependencyInfo> {
            vec![DependencyInfo::new(&NAME)]
        }

        fn construct(mut args: Args) -> Result<Self, DynError> {
            Ok(Named(args.next()?))
        }
    }
    impl Module for Named {
        fn descriptor() -> Option<ModuleDescriptor> {
            Some(
                ModuleDescriptor::new()
                    .with_id("named")
                    .add_provider(Provider::value(&NAME, "named".to_string()))
                    .add_declaration::<String>(),
            )
        }
    }

    struct Plain;
    impl Constructible for Plain {
        fn construct(_: Args) -> Result<Self, DynError> {
            Ok(Plain)
        }
    }
    impl Module for Plain {
        fn descriptor() -> Option<ModuleDescriptor> {
            None
        }
    }

    #[test]
    fn module_type_is_identified_by_type() {
        assert_eq!(ModuleType::of::<Named>(), ModuleType::of::<Named>());
        assert_ne!(ModuleType::of::<Named>(), ModuleType::of::<Plain>());
        assert!(ModuleType::of::<Plain>().descriptor().is_none());
    }

    #[test]
    fn descriptor_builder_keeps_order() {
        let descriptor = ModuleDescriptor::new()
            .add_import::<Named>()
            .add_import_with::<Plain>([Provider::value(&NAME, 1_u8)])
            .add_declaration::<u8>()
            .add_declaration::<u16>();

        let imports: Vec<_> = descriptor.imports().iter().map(Import::module_type).collect();
        assert_eq!(imports, [ModuleType::of::<Named>(), ModuleType::of::<Plain>()]);
        assert_eq!(descriptor.imports()[0].extra_providers().len(), 0);
        assert_eq!(descriptor.imports()[1].extra_providers().len(), 1);
        assert_eq!(descriptor.declarations(), [Token::of::<u8>(), Token::of::<u16>()]);
        assert_eq!(ModuleType::of::<Named>().descriptor().unwrap().id(), Some("named"));
    }

    #[test]
    fn providers_can_be_added_in_bulk() {
        static PORT: InjectionToken = InjectionToken::new("PORT");

        let descriptor = ModuleDescriptor::new()
            .add_provider(Provider::value(&NAME, "named".to_string()))
            .add_providers([Provider::value(&PORT, 80_u16), Provider::value(&PORT, 8080_u16)]);
        assert_eq!(descriptor.providers().len(), 3);

        // The later registration of the same token wins
        let injector = Injector::create(descriptor.providers().to_vec(), None).unwrap();
        assert_eq!(*injector.get::<u16>(&PORT).unwrap(), 8080);
        assert_eq!(*injector.get::<String>(&NAME).unwrap(), "named");
    }

    #[test]
    fn erased_instantiation_resolves_dependencies() {
        let module_type = ModuleType::of::<Named>();
        let injector = Injector::create(module_type.descriptor().unwrap().providers().to_vec(), None).unwrap();

        let instance = block_on(module_type.instantiate(&injector)).unwrap();
        let module_ref = ModuleRef::new(module_type, ModuleDescriptor::new(), injector);
        module_ref.set_instance(instance);

        assert_eq!(*module_ref.instance_of::<Named>().unwrap().0, "named");
    }

    #[test]
    fn handle_does_not_keep_the_module_alive() {
        let injector = Injector::create([], None).unwrap();
        let module_ref = Arc::new(ModuleRef::new(ModuleType::of::<Plain>(), ModuleDescriptor::new(), injector));
        let handle = ModuleHandle::default();
        assert!(handle.get().is_none());

        handle.bind(&module_ref);
        assert!(Arc::ptr_eq(&handle.get().unwrap(), &module_ref));

        drop(module_ref);
        assert!(handle.get().is_none());
    }
}
