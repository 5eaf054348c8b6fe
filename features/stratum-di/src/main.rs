use std::sync::Arc;

use stratum_di::{
    Args, Constructible, DependencyInfo, DynError, InjectionToken, Injector, Provider,
};

static GREETING: InjectionToken = InjectionToken::new("GREETING");

fn main() {
    let root = Injector::create([Provider::value(&GREETING, "hello".to_string())], None).unwrap();
    let child = Injector::create(
        [
            Provider::constructible::<Test>(),
            Provider::factory_async(&GREETING, vec![], |_| async {
                Ok::<_, DynError>("hello from the child".to_string())
            }),
        ],
        Some(&root),
    )
    .unwrap();

    let test = futures::executor::block_on(child.resolve_async::<Test>()).unwrap();
    println!("{}", test.a);
    println!("{:?}", child);
    println!("{:?}", root.resolve::<Test>().unwrap_err().to_string());
}

#[derive(Debug)]
struct Test {
    a: Arc<String>,
}

impl Constructible for Test {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::new(&GREETING)]
    }

    fn construct(mut args: Args) -> Result<Self, DynError> {
        Ok(Test { a: args.next()? })
    }
}
