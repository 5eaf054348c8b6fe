use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, OnceLock, Weak},
};

use stratum_config::ConfigProvider;
use stratum_di::{
    Args, DependencyInfo, DynError, InjectionToken, Injector, InstanceList, Provider, Token,
};

use crate::{
    errors::{ModuleError, StartError},
    graph::ModuleGraph,
    module::{Module, ModuleRef, ModuleType},
};

/// Multi token of the asynchronous initializers of a module
///
/// Every initializer visible to a module's injector is awaited, in registration order,
/// before the module is instantiated. Register them with [app_initializer].
pub static APP_INITIALIZER: InjectionToken = InjectionToken::new("APP_INITIALIZER");

/// Creates an [APP_INITIALIZER] provider
///
/// # Example
/// ```rust
/// use stratum::app_initializer;
/// use stratum_di::{DependencyInfo, DynError, InjectionToken};
///
/// static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
///
/// let provider = app_initializer(vec![DependencyInfo::new(&DB_URL)], |mut args| async move {
///     let url: std::sync::Arc<String> = args.next()?;
///     println!("connecting to {url}");
///     Ok::<_, DynError>(())
/// });
/// assert!(provider.is_multi());
/// ```
pub fn app_initializer<E, F, Fut>(dependencies: Vec<DependencyInfo>, initializer: F) -> Provider
where
    E: Into<DynError> + 'static,
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    Provider::factory_async(&APP_INITIALIZER, dependencies, initializer).multi()
}

/// A bootstrapped module tree
///
/// Created with [Application::bootstrap] or [Application::builder]. All graph errors are
/// raised there, [Application::start] then initializes and instantiates the modules.
/// Clones share the same modules.
#[derive(Clone)]
pub struct Application(Arc<ApplicationInner>);

struct ApplicationInner {
    main: Arc<ModuleRef>,
    injector: Injector,
    modules: Vec<Arc<ModuleRef>>,
    declarations: HashMap<Token, Arc<ModuleRef>>,
}

impl Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("main", &self.0.main.module_type())
            .field("modules", &self.0.modules)
            .finish()
    }
}

/// The running application, seen from inside a module
///
/// The root injector provides it under `Token::of::<ApplicationHandle>()`, so every
/// module can read the graph while it is constructed. The handle does not keep the
/// application alive.
#[derive(Clone, Default)]
pub struct ApplicationHandle(Arc<OnceLock<Weak<ApplicationInner>>>);

impl ApplicationHandle {
    fn bind(&self, application: &Application) {
        let _ = self.0.set(Arc::downgrade(&application.0));
    }

    /// Returns the application, `None` if it was dropped
    pub fn get(&self) -> Option<Application> {
        self.0.get().and_then(Weak::upgrade).map(Application)
    }
}

impl Debug for ApplicationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let main = self.get().map(|application| application.0.main.module_type());
        f.debug_tuple("ApplicationHandle").field(&main).finish()
    }
}

/// Collects application level providers before bootstrapping
#[derive(Default)]
pub struct ApplicationBuilder {
    providers: Vec<Provider>,
}

impl ApplicationBuilder {
    /// Adds a provider to the root injector, visible to every module
    pub fn provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Provider>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Makes the configs injectable with `Config<T>` in every module
    pub fn config(self, config: ConfigProvider) -> Self {
        self.provider(config.into_provider())
    }

    /// Loads the module tree of `M`
    pub fn bootstrap<M: Module>(mut self) -> Result<Application, ModuleError> {
        let handle = ApplicationHandle::default();
        self.providers
            .push(Provider::value(Token::of::<ApplicationHandle>(), handle.clone()));

        let injector = Injector::create(self.providers, None).map_err(ModuleError::RootProvider)?;
        let (graph, main) = ModuleGraph::build(ModuleType::of::<M>(), &injector)?;

        let application = Application(Arc::new(ApplicationInner {
            main,
            injector,
            modules: graph.modules,
            declarations: graph.declarations,
        }));
        handle.bind(&application);
        Ok(application)
    }
}

impl Application {
    /// Loads the module tree of `M` without application level providers
    pub fn bootstrap<M: Module>() -> Result<Application, ModuleError> {
        Application::builder().bootstrap::<M>()
    }

    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Every loaded module in build order, the main module first
    pub fn modules(&self) -> &[Arc<ModuleRef>] {
        &self.0.modules
    }

    /// Declared types and the module declaring them
    pub fn declarations(&self) -> &HashMap<Token, Arc<ModuleRef>> {
        &self.0.declarations
    }

    pub fn declaring_module<T: 'static + ?Sized>(&self) -> Option<&Arc<ModuleRef>> {
        self.0.declarations.get(&Token::of::<T>())
    }

    pub fn main(&self) -> &Arc<ModuleRef> {
        &self.0.main
    }

    /// The root injector, parent of the main module's injector
    pub fn injector(&self) -> &Injector {
        &self.0.injector
    }

    /// Initializes and instantiates every module in build order
    ///
    /// Modules are started one after the other. The first failing initializer or
    /// constructor aborts the startup, later modules stay uninstantiated.
    /// Modules started by an earlier call are skipped.
    pub async fn start(&self) -> Result<Arc<ModuleRef>, StartError> {
        for module_ref in &self.0.modules {
            if module_ref.is_instantiated() {
                continue;
            }

            let module_type = module_ref.module_type();
            let module = module_type.info();

            let initializers = module_ref
                .injector()
                .get_optional_async::<InstanceList>(&APP_INITIALIZER)
                .await
                .map_err(|source| StartError::Initializer { module, source })?;
            tracing::debug!(
                "Awaited {} initializers of {}",
                initializers.map_or(0, |list| list.len()),
                module
            );

            let instance = module_type
                .instantiate(module_ref.injector())
                .await
                .map_err(|source| StartError::Instantiate { module, source })?;
            module_ref.set_instance(instance);

            tracing::debug!("Started module {}", module);
        }

        Ok(self.0.main.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::executor::block_on;
    use stratum_config::Config;
    use stratum_di::{Constructible, InjectError, Resolver};

    use super::*;
    use crate::module::ModuleDescriptor;

    static LOG: InjectionToken = InjectionToken::new("LOG");

    type Log = Mutex<Vec<&'static str>>;

    fn record(name: &'static str) -> Provider {
        app_initializer(vec![DependencyInfo::new(&LOG)], move |mut args| async move {
            let log: Arc<Log> = args.next()?;
            log.lock().unwrap().push(name);
            Ok::<_, DynError>(())
        })
    }

    struct Port(u16);

    struct Child;
    impl Constructible for Child {
        fn construct(_: Args) -> Result<Self, DynError> {
            Ok(Child)
        }
    }
    impl Module for Child {
        fn descriptor() -> Option<ModuleDescriptor> {
            Some(ModuleDescriptor::new().add_provider(record("child")))
        }
    }

    struct Main {
        port: u16,
    }
    impl Constructible for Main {
        fn dependencies() -> Vec<DependencyInfo> {
            vec![Config::<Port>::dependency_info()]
        }

        fn construct(mut args: Args) -> Result<Self, DynError> {
            let port: Config<Port> = args.next()?;
            Ok(Main { port: port.0 })
        }
    }
    impl Module for Main {
        fn descriptor() -> Option<ModuleDescriptor> {
            Some(
                ModuleDescriptor::new()
                    .add_import::<Child>()
                    .add_provider(record("main")),
            )
        }
    }

    fn application() -> (Application, Arc<Log>) {
        let log = Arc::new(Log::default());
        let mut config = ConfigProvider::new();
        config.add_config(Port(8080)).unwrap();

        let application = Application::builder()
            .config(config)
            .provider(Provider::for_token(&LOG).use_instance(stratum_di::Instance::from_arc(log.clone())))
            .bootstrap::<Main>()
            .unwrap();
        (application, log)
    }

    #[test]
    fn application_providers_are_visible_to_modules() {
        let (application, _) = application();

        let main = block_on(application.start()).unwrap();
        assert_eq!(main.instance_of::<Main>().unwrap().port, 8080);
        assert!(main.injector().parent().unwrap().ptr_eq(application.injector()));
    }

    #[test]
    fn initializers_run_before_instantiation_in_registration_order() {
        let (application, log) = application();
        block_on(application.start()).unwrap();

        // Both initializers are registered in Main's injector, Child sees the cached list
        assert_eq!(*log.lock().unwrap(), ["main", "child"]);
        assert!(application.modules().iter().all(|module| module.is_instantiated()));
    }

    #[test]
    fn start_can_be_called_again() {
        let (application, log) = application();

        let first = block_on(application.start()).unwrap();
        let second = block_on(application.start()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.instance().unwrap().ptr_eq(second.instance().unwrap()));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_config_aborts_startup() {
        let application = Application::builder()
            .provider(Provider::value(&LOG, Log::default()))
            .config(ConfigProvider::new())
            .bootstrap::<Main>()
            .unwrap();

        let err = block_on(application.start()).unwrap_err();
        assert!(matches!(err, StartError::Instantiate { module, source: InjectError::Other(_) } if module == ModuleType::of::<Main>().info()));
        assert!(application.modules().iter().all(|module| !module.is_instantiated()));
    }

    #[test]
    fn builder_accepts_several_providers_at_once() {
        static GREETING: InjectionToken = InjectionToken::new("GREETING");

        let application = Application::builder()
            .providers([
                Provider::value(&LOG, Log::default()),
                Provider::value(&GREETING, "hello"),
            ])
            .bootstrap::<Child>()
            .unwrap();

        assert_eq!(*application.injector().get::<&str>(&GREETING).unwrap(), "hello");
        block_on(application.start()).unwrap();
    }

    struct Greeter;
    impl Constructible for Greeter {
        fn construct(_: Args) -> Result<Self, DynError> {
            Ok(Greeter)
        }
    }

    struct Catalog {
        declared: Vec<Token>,
    }
    impl Constructible for Catalog {
        fn dependencies() -> Vec<DependencyInfo> {
            vec![DependencyInfo::of::<ApplicationHandle>()]
        }

        fn construct(mut args: Args) -> Result<Self, DynError> {
            let handle: Arc<ApplicationHandle> = args.next()?;
            let application = handle.get().ok_or("application dropped")?;
            let declared = application.declarations().keys().copied().collect();
            Ok(Catalog { declared })
        }
    }
    impl Module for Catalog {
        fn descriptor() -> Option<ModuleDescriptor> {
            Some(
                ModuleDescriptor::new()
                    .add_declaration::<Catalog>()
                    .add_declaration::<Greeter>(),
            )
        }
    }

    #[test]
    fn modules_can_read_the_application_while_constructed() {
        let application = Application::bootstrap::<Catalog>().unwrap();

        let main = block_on(application.start()).unwrap();
        let catalog = main.instance_of::<Catalog>().unwrap();
        assert_eq!(catalog.declared.len(), 2);
        assert!(catalog.declared.contains(&Token::of::<Greeter>()));
        assert!(catalog.declared.contains(&Token::of::<Catalog>()));

        let handle = application.injector().resolve::<ApplicationHandle>().unwrap();
        assert!(Arc::ptr_eq(handle.get().unwrap().main(), application.main()));
    }

    #[test]
    fn application_handle_does_not_keep_the_application_alive() {
        let application = Application::bootstrap::<Catalog>().unwrap();
        let handle = application.injector().resolve::<ApplicationHandle>().unwrap();
        assert!(handle.get().is_some());

        drop(application);
        assert!(handle.get().is_none());
    }

    #[test]
    fn invalid_application_providers_are_rejected() {
        let err = Application::builder()
            .provider(Provider::for_token(&LOG))
            .bootstrap::<Main>()
            .unwrap_err();
        assert!(matches!(err, ModuleError::RootProvider(_)));
    }
}
