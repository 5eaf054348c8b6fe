use std::{collections::HashMap, sync::Arc};

use stratum_di::{Injector, Provider, Token};

use crate::{
    errors::ModuleError,
    module::{ModuleDescriptor, ModuleHandle, ModuleRef, ModuleType},
};

/// Loaded modules in build order and the owner of every declared type
#[derive(Debug, Default)]
pub(crate) struct ModuleGraph {
    pub modules: Vec<Arc<ModuleRef>>,
    pub declarations: HashMap<Token, Arc<ModuleRef>>,
}

fn describe(module_type: ModuleType) -> Result<ModuleDescriptor, ModuleError> {
    module_type.descriptor().ok_or(ModuleError::NotAModule {
        module: module_type.info(),
    })
}

impl ModuleGraph {
    /// Loads `root` and its imports depth first, in pre-order
    ///
    /// The root module's injector is a child of `parent` and sees the root's own providers.
    /// Returns the graph and the root module.
    pub fn build(
        root: ModuleType,
        parent: &Injector,
    ) -> Result<(ModuleGraph, Arc<ModuleRef>), ModuleError> {
        let descriptor = describe(root)?;
        let providers = descriptor.providers().to_vec();

        let mut graph = ModuleGraph::default();
        let root = graph.load(root, descriptor, parent, providers)?;

        tracing::debug!(
            "Built module graph of {} with {} modules",
            root.module_type().info(),
            graph.modules.len()
        );
        Ok((graph, root))
    }

    fn load(
        &mut self,
        module_type: ModuleType,
        descriptor: ModuleDescriptor,
        parent: &Injector,
        initial_providers: Vec<Provider>,
    ) -> Result<Arc<ModuleRef>, ModuleError> {
        let handle = ModuleHandle::default();
        let mut providers = initial_providers;
        providers.push(Provider::value(Token::of::<ModuleHandle>(), handle.clone()));

        // Providers of direct imports are visible to this module, deeper ones are not
        let mut imports: Vec<(ModuleType, ModuleDescriptor)> = Vec::new();
        for import in descriptor.imports() {
            let import_type = import.module_type();
            if imports.iter().any(|(loaded, _)| *loaded == import_type) {
                return Err(ModuleError::DuplicateImport {
                    module: import_type.info(),
                    importer: module_type.info(),
                });
            }

            let import_descriptor = describe(import_type)?;
            providers.extend(import_descriptor.providers().iter().cloned());
            providers.extend(import.extra_providers().iter().cloned());
            imports.push((import_type, import_descriptor));
        }

        let injector = Injector::create(providers, Some(parent)).map_err(|source| {
            ModuleError::Provider {
                module: module_type.info(),
                source,
            }
        })?;

        let module_ref = Arc::new(ModuleRef::new(module_type, descriptor, injector));
        handle.bind(&module_ref);
        self.modules.push(module_ref.clone());
        tracing::debug!("Loaded module {}", module_type.info());

        for declaration in module_ref.descriptor().declarations() {
            // Also raised when the declaring module is loaded a second time
            if let Some(owner) = self.declarations.get(declaration) {
                return Err(ModuleError::DuplicateDeclaration {
                    declaration: *declaration,
                    module: module_type.info(),
                    declared_in: owner.module_type().info(),
                });
            }
            self.declarations.insert(*declaration, module_ref.clone());
        }

        for (import_type, import_descriptor) in imports {
            self.load(
                import_type,
                import_descriptor,
                module_ref.injector(),
                Vec::new(),
            )?;
        }

        Ok(module_ref)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stratum_di::{
        Args, Constructible, DynError, InjectError, InjectionToken, Provider, ProviderError,
    };

    use super::*;
    use crate::module::Module;

    static DB_URL: InjectionToken = InjectionToken::new("DB_URL");
    static DEEP: InjectionToken = InjectionToken::new("DEEP");
    static EXTRA: InjectionToken = InjectionToken::new("EXTRA");

    macro_rules! module {
        ($name:ident, $descriptor:expr) => {
            struct $name;
            impl Constructible for $name {
                fn construct(_: Args) -> Result<Self, DynError> {
                    Ok($name)
                }
            }
            impl Module for $name {
                fn descriptor() -> Option<ModuleDescriptor> {
                    $descriptor
                }
            }
        };
    }

    module!(
        Deep,
        Some(ModuleDescriptor::new().add_provider(Provider::value(&DEEP, "deep")))
    );
    module!(
        Db,
        Some(
            ModuleDescriptor::new()
                .add_import::<Deep>()
                .add_provider(Provider::value(&DB_URL, "mem://"))
        )
    );
    module!(Logging, Some(ModuleDescriptor::new().with_id("logging")));
    module!(
        Api,
        Some(
            ModuleDescriptor::new()
                .add_import_with::<Db>([Provider::value(&EXTRA, 1_u8)])
                .add_declaration::<String>()
        )
    );
    module!(
        Root,
        Some(
            ModuleDescriptor::new()
                .add_import::<Api>()
                .add_import::<Logging>()
                .add_provider(Provider::value(&EXTRA, 0_u8))
        )
    );
    module!(NotAModule, None);
    module!(
        ImportsTwice,
        Some(ModuleDescriptor::new().add_import::<Logging>().add_import::<Logging>())
    );
    module!(
        ImportsNotAModule,
        Some(ModuleDescriptor::new().add_import::<NotAModule>())
    );
    module!(
        AlsoDeclaresString,
        Some(ModuleDescriptor::new().add_declaration::<String>())
    );
    module!(
        ConflictingDeclarations,
        Some(
            ModuleDescriptor::new()
                .add_import::<Api>()
                .add_import::<AlsoDeclaresString>()
        )
    );
    module!(
        BadProviders,
        Some(
            ModuleDescriptor::new()
                .add_provider(Provider::value(&EXTRA, 1_u8).multi())
                .add_provider(Provider::value(&EXTRA, 2_u8))
        )
    );

    fn build<M: Module>() -> Result<(ModuleGraph, Arc<ModuleRef>), ModuleError> {
        let root = Injector::create([], None).unwrap();
        ModuleGraph::build(ModuleType::of::<M>(), &root)
    }

    fn module<M: Module>(graph: &ModuleGraph) -> &Arc<ModuleRef> {
        graph
            .modules
            .iter()
            .find(|module| module.module_type() == ModuleType::of::<M>())
            .unwrap()
    }

    #[test]
    fn modules_are_loaded_depth_first_in_pre_order() {
        let (graph, root) = build::<Root>().unwrap();

        let order: Vec<_> = graph.modules.iter().map(|module| module.module_type()).collect();
        assert_eq!(
            order,
            [
                ModuleType::of::<Root>(),
                ModuleType::of::<Api>(),
                ModuleType::of::<Db>(),
                ModuleType::of::<Deep>(),
                ModuleType::of::<Logging>(),
            ]
        );
        assert!(Arc::ptr_eq(&root, &graph.modules[0]));
    }

    #[test]
    fn module_injectors_follow_the_import_tree() {
        let (graph, root) = build::<Root>().unwrap();

        let api = module::<Api>(&graph);
        let db = module::<Db>(&graph);
        let logging = module::<Logging>(&graph);
        assert!(api.injector().parent().unwrap().ptr_eq(root.injector()));
        assert!(db.injector().parent().unwrap().ptr_eq(api.injector()));
        assert!(logging.injector().parent().unwrap().ptr_eq(root.injector()));
    }

    #[test]
    fn direct_imports_expose_their_providers() {
        let (graph, root) = build::<Root>().unwrap();

        let api = module::<Api>(&graph);
        assert_eq!(*api.injector().get::<&str>(&DB_URL).unwrap(), "mem://");
        assert_eq!(*api.injector().get::<u8>(&EXTRA).unwrap(), 1);
        // Db's own provider lives in Api's injector, so Db sees it through its parent
        assert_eq!(*module::<Db>(&graph).injector().get::<&str>(&DB_URL).unwrap(), "mem://");

        // Root's own providers are visible to itself
        assert_eq!(*root.injector().get::<u8>(&EXTRA).unwrap(), 0);
    }

    #[test]
    fn transitive_imports_are_not_exposed() {
        let (graph, root) = build::<Root>().unwrap();

        assert!(matches!(
            module::<Api>(&graph).injector().get::<&str>(&DEEP),
            Err(InjectError::NotFound { .. })
        ));
        assert!(matches!(
            root.injector().get::<&str>(&DB_URL),
            Err(InjectError::NotFound { .. })
        ));
        assert!(matches!(
            module::<Logging>(&graph).injector().get::<&str>(&DB_URL),
            Err(InjectError::NotFound { .. })
        ));
        assert_eq!(*module::<Db>(&graph).injector().get::<&str>(&DEEP).unwrap(), "deep");
    }

    #[test]
    fn every_module_injector_knows_its_module() {
        let (graph, _) = build::<Root>().unwrap();

        for module in &graph.modules {
            let handle = module.injector().resolve::<ModuleHandle>().unwrap();
            assert!(Arc::ptr_eq(&handle.get().unwrap(), module));
        }
    }

    #[test]
    fn declarations_are_owned_by_their_module() {
        let (graph, _) = build::<Root>().unwrap();

        let owner = graph.declarations.get(&Token::of::<String>()).unwrap();
        assert_eq!(owner.module_type(), ModuleType::of::<Api>());
        assert_eq!(graph.declarations.len(), 1);
    }

    #[test]
    fn it_rejects_types_without_descriptor() {
        let err = build::<NotAModule>().unwrap_err();
        assert!(matches!(err, ModuleError::NotAModule { module } if module == ModuleType::of::<NotAModule>().info()));

        let err = build::<ImportsNotAModule>().unwrap_err();
        assert!(matches!(err, ModuleError::NotAModule { module } if module == ModuleType::of::<NotAModule>().info()));
    }

    #[test]
    fn it_rejects_duplicate_imports_in_one_list() {
        let err = build::<ImportsTwice>().unwrap_err();
        assert!(matches!(
            err,
            ModuleError::DuplicateImport { module, importer }
                if module == ModuleType::of::<Logging>().info()
                    && importer == ModuleType::of::<ImportsTwice>().info()
        ));
    }

    #[test]
    fn the_same_module_may_be_imported_at_different_depths() {
        module!(
            Diamond,
            Some(
                ModuleDescriptor::new()
                    .add_import::<Api>()
                    .add_import::<Db>()
            )
        );

        let (graph, _) = build::<Diamond>().unwrap();
        let db_count = graph
            .modules
            .iter()
            .filter(|module| module.module_type() == ModuleType::of::<Db>())
            .count();
        assert_eq!(db_count, 2);
    }

    #[test]
    fn a_declaring_module_may_be_loaded_only_once() {
        struct Routed;
        module!(
            Router,
            Some(ModuleDescriptor::new().add_declaration::<Routed>())
        );
        module!(
            Routes,
            Some(ModuleDescriptor::new().add_import::<Router>())
        );
        module!(
            SharedRouter,
            Some(
                ModuleDescriptor::new()
                    .add_import::<Routes>()
                    .add_import::<Router>()
            )
        );

        let err = build::<SharedRouter>().unwrap_err();
        assert!(matches!(
            err,
            ModuleError::DuplicateDeclaration { declaration, module, declared_in }
                if declaration == Token::of::<Routed>()
                    && module == ModuleType::of::<Router>().info()
                    && declared_in == ModuleType::of::<Router>().info()
        ));
    }

    #[test]
    fn it_rejects_a_type_declared_by_two_modules() {
        let err = build::<ConflictingDeclarations>().unwrap_err();
        assert!(matches!(
            err,
            ModuleError::DuplicateDeclaration { declaration, module, declared_in }
                if declaration == Token::of::<String>()
                    && module == ModuleType::of::<AlsoDeclaresString>().info()
                    && declared_in == ModuleType::of::<Api>().info()
        ));
    }

    #[test]
    fn provider_errors_name_the_module() {
        let err = build::<BadProviders>().unwrap_err();
        assert!(matches!(
            err,
            ModuleError::Provider { module, source: ProviderError::MultiProviderConflict { .. } }
                if module == ModuleType::of::<BadProviders>().info()
        ));
    }
}
