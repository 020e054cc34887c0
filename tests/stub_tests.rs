//! Integration tests for stubs, conditions and custom slot owners.

use std::sync::Arc;

use parking_lot::RwLock;
use testkit_doubles::mock::matcher::predicate;
use testkit_doubles::{stub, Coroutine, Error, Member, Object, SlotOwner, Stub, Target, This};

/// A hand-written owner with a single coroutine slot.
struct Generator {
    gen: RwLock<Coroutine<(), u32, String>>,
    seed: u32,
}

impl Generator {
    fn new(seed: u32) -> Arc<Self> {
        Arc::new(Self {
            gen: RwLock::new(Coroutine::named("gen", |(), this: This| async move {
                let owner = this.downcast::<Generator>().ok_or("unbound")?;
                Ok::<_, String>(owner.seed * 2)
            })),
            seed,
        })
    }

    async fn gen(self: &Arc<Self>) -> Result<u32, String> {
        let coroutine = self.gen.read().clone();
        coroutine.call((), This::of(self)).await
    }
}

impl SlotOwner<(), u32, String> for Generator {
    fn member(&self, name: &str) -> Option<Member<(), u32, String>> {
        match name {
            "gen" => Some(Member::Coroutine(self.gen.read().clone())),
            "seed" => Some(Member::Value(Arc::new(self.seed))),
            _ => None,
        }
    }

    fn assign(&self, name: &str, coroutine: Coroutine<(), u32, String>) {
        if name == "gen" {
            *self.gen.write() = coroutine;
        }
    }
}

#[tokio::test]
async fn test_custom_owner_original_behavior() {
    let generator = Generator::new(21);
    assert_eq!(generator.gen().await, Ok(42));
}

#[tokio::test]
async fn test_stub_throws_then_reset_restores() {
    let generator = Generator::new(5);

    let stub = Stub::on(&generator, "gen")
        .unwrap()
        .throws("boom".to_string());
    assert_eq!(generator.gen().await, Err("boom".to_string()));
    assert!(stub.called_once());

    assert!(stub.reset());
    assert_eq!(generator.gen().await, Ok(10));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn test_stub_delegate_sees_owner_context() {
    let generator = Generator::new(3);
    let delegate = Coroutine::new(|(), this: This| async move {
        let owner = this.downcast::<Generator>().ok_or("unbound")?;
        Ok::<_, String>(owner.seed + 100)
    });

    let _stub = Stub::on(&generator, "gen").unwrap().calls(delegate);

    assert_eq!(generator.gen().await, Ok(103));
}

#[tokio::test]
async fn test_stub_on_value_member_fails() {
    let generator = Generator::new(1);
    assert!(matches!(
        Stub::on(&generator, "seed"),
        Err(Error::InvalidTarget(_))
    ));
}

#[tokio::test]
async fn test_first_call_override_then_default() {
    let stub = Stub::<(), i32, String>::new().returns(1);
    stub.on_first_call().returns(42);

    assert_eq!(stub.invoke(()).await, Ok(42));
    assert_eq!(stub.call_count(), 1);
    assert_eq!(stub.invoke(()).await, Ok(1));
    assert_eq!(stub.call_count(), 2);
}

#[tokio::test]
async fn test_with_args_and_default() {
    let stub = Stub::<(i32, i32), i32, String>::new().returns(0);
    stub.with_args((1, 2)).returns(2);

    assert_eq!(stub.invoke((1, 2)).await, Ok(2));
    assert_eq!(stub.invoke((2, 1)).await, Ok(0));
    assert_eq!(stub.invoke((9, 9)).await, Ok(0));
}

#[tokio::test]
async fn test_overlapping_conditions_last_registered_wins() {
    let stub = Stub::<(i32,), &'static str, String>::new().returns("default");
    stub.with_args_matching(predicate("positive", |a: &(i32,)| a.0 > 0))
        .returns("positive");
    stub.with_args((5,)).returns("five");

    assert_eq!(stub.invoke((5,)).await, Ok("five"));
    assert_eq!(stub.invoke((4,)).await, Ok("positive"));
    assert_eq!(stub.invoke((-4,)).await, Ok("default"));
}

#[tokio::test]
async fn test_returns_this_on_owner() {
    let owner: Arc<Object<(), This, String>> = Arc::new(
        Object::new().with_method("me", Coroutine::new(|(), _| async { Ok(This::unbound()) })),
    );

    let _stub = Stub::on(&owner, "me").unwrap().returns_this();

    let this = owner.invoke("me", ()).unwrap().await.unwrap();
    assert!(this.is(&owner));
}

#[tokio::test]
async fn test_throws_default_uses_forced_failure() {
    let stub = stub::<(), (), Error>(Target::Anonymous)
        .unwrap()
        .throws_default();

    let err = stub.invoke(()).await.unwrap_err();
    assert_eq!(err, Error::ForcedFailure);
    assert_eq!(err.to_string(), "Stub forced failure");
}

#[tokio::test]
async fn test_conditions_return_owner_then_force_failure() {
    let owner: Arc<Object<(), This, Error>> = Arc::new(
        Object::new().with_method("me", Coroutine::new(|(), _| async { Ok(This::unbound()) })),
    );

    let stub = Stub::on(&owner, "me").unwrap();
    stub.on_first_call().returns_this();
    stub.on_second_call().throws_default();

    let first = owner.invoke("me", ()).unwrap().await.unwrap();
    assert!(first.is(&owner));

    let second = owner.invoke("me", ()).unwrap().await;
    assert_eq!(second.err(), Some(Error::ForcedFailure));

    // Third call has no condition and gets the default, an unbound context.
    let third = owner.invoke("me", ()).unwrap().await.unwrap();
    assert!(!third.is_bound());
    assert_eq!(stub.call_count(), 3);
}

#[tokio::test]
async fn test_counter_follows_invocation_order() {
    let stub = Stub::<(), u8, String>::new().returns(0);
    stub.on_second_call().returns(2);

    // Both calls are made before either future is polled.
    let first = stub.invoke(());
    let second = stub.invoke(());
    assert_eq!(stub.call_count(), 2);

    let (second, first) = futures::join!(second, first);
    assert_eq!(first, Ok(0));
    assert_eq!(second, Ok(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stub_across_threads() {
    let stub = Stub::<(u32,), u32, String>::new().returns_with(|args, _| args.0 * 10);
    stub.with_args((3,)).throws("three".to_string());

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let call = stub.invoke((i,));
            tokio::spawn(call)
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(stub.call_count(), 6);
    assert_eq!(results[2], Ok(20));
    assert_eq!(results[3], Err("three".to_string()));
}
