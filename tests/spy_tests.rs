//! Integration tests for spies on free coroutines and owner slots.

use std::sync::Arc;

use testkit_doubles::mock::matcher::{eq, predicate};
use testkit_doubles::{spy, Coroutine, Error, Object, Spy, This};
use tokio::sync::Notify;

type Calculator = Object<(i32, i32), i32, String>;

fn calculator() -> Arc<Calculator> {
    Arc::new(
        Object::new()
            .with_method(
                "add",
                Coroutine::named("add", |(a, b): (i32, i32), _| async move { Ok(a + b) }),
            )
            .with_method(
                "div",
                Coroutine::named("div", |(a, b): (i32, i32), _| async move {
                    if b == 0 {
                        Err("division by zero".to_string())
                    } else {
                        Ok(a / b)
                    }
                }),
            )
            .with_value("precision", 2_u8),
    )
}

#[tokio::test]
async fn test_spy_returns_what_original_returns() {
    let double: Coroutine<(i32,), i32, String> =
        Coroutine::new(|(x,), _| async move { Ok(x * 2) });
    let spy = Spy::new(double);

    assert_eq!(spy.invoke((21,)).await, Ok(42));
    assert!(spy.called_once());
    assert!(spy.first_call().unwrap().called_with(&(21,)));
    assert!(spy.first_call().unwrap().returned(&42));
}

#[tokio::test]
async fn test_spy_on_owner_records_owner_context() {
    let calc = calculator();
    let spy = Spy::on(&calc, "add").unwrap();

    assert_eq!(calc.invoke("add", (1, 2)).unwrap().await, Ok(3));
    assert_eq!(calc.invoke("add", (3, 4)).unwrap().await, Ok(7));

    assert!(spy.called_twice());
    let calls = spy.calls();
    assert!(calls[0].called_with(&(1, 2)));
    assert!(calls[1].called_with(&(3, 4)));
    assert!(calls.iter().all(|c| c.called_on(&calc)));
    assert!(spy.was_called_matching(&predicate("sum above 5", |a: &(i32, i32)| a.0 + a.1 > 5)));
    assert!(!spy.was_called_matching(&eq((0, 0))));
}

#[tokio::test]
async fn test_spy_does_not_record_failures() {
    let calc = calculator();
    let spy = Spy::on(&calc, "div").unwrap();

    assert_eq!(
        calc.invoke("div", (1, 0)).unwrap().await,
        Err("division by zero".to_string())
    );
    assert!(!spy.was_called());

    assert_eq!(calc.invoke("div", (8, 2)).unwrap().await, Ok(4));
    assert!(spy.called_once());
}

#[tokio::test]
async fn test_spy_reset_restores_original() {
    let calc = calculator();
    let original = calc.method("add").unwrap();
    let spy = Spy::on(&calc, "add").unwrap();

    calc.invoke("add", (1, 1)).unwrap().await.unwrap();
    assert!(spy.reset());

    assert!(calc.method("add").unwrap().ptr_eq(&original));
    assert_eq!(spy.call_count(), 0);

    // No longer installed, so calls bypass the spy.
    calc.invoke("add", (1, 1)).unwrap().await.unwrap();
    assert_eq!(spy.call_count(), 0);

    assert!(spy.install());
    calc.invoke("add", (1, 1)).unwrap().await.unwrap();
    assert!(spy.called_once());
}

#[tokio::test]
async fn test_spy_construction_errors() {
    let calc = calculator();

    assert!(matches!(
        Spy::on(&calc, "precision"),
        Err(Error::InvalidTarget(_))
    ));
    assert!(matches!(Spy::on(&calc, "mul"), Err(Error::InvalidTarget(_))));
    assert!(matches!(
        spy::<(i32, i32), i32, String>(testkit_doubles::Target::Anonymous),
        Err(Error::InvalidTarget(_))
    ));
    assert_eq!(calc.invoke("mul", (1, 1)).err(), Some(Error::missing_member("mul")));
}

#[tokio::test]
async fn test_spies_on_separate_members_are_independent() {
    let calc = calculator();
    let add = Spy::on(&calc, "add").unwrap();
    let div = Spy::on(&calc, "div").unwrap();

    calc.invoke("add", (1, 2)).unwrap().await.unwrap();

    assert!(add.called_once());
    assert!(!div.was_called());
}

#[tokio::test]
async fn test_calls_are_recorded_in_completion_order() {
    let gates: Arc<[Notify; 2]> = Arc::new([Notify::new(), Notify::new()]);
    let waiting = {
        let gates = Arc::clone(&gates);
        Coroutine::new(move |(id,): (usize,), _this: This| {
            let gates = Arc::clone(&gates);
            async move {
                gates[id].notified().await;
                Ok::<_, String>(id)
            }
        })
    };
    let spy = Spy::new(waiting);

    let first = spy.invoke((0,));
    let second = spy.invoke((1,));
    let release = async {
        gates[1].notify_one();
        tokio::task::yield_now().await;
        gates[0].notify_one();
    };

    let (first, second, ()) = futures::join!(first, second, release);

    assert_eq!(first, Ok(0));
    assert_eq!(second, Ok(1));
    assert!(spy.first_call().unwrap().called_with(&(1,)));
    assert!(spy.second_call().unwrap().called_with(&(0,)));
    assert!(spy.last_call().unwrap().called_with(&(0,)));
}

#[tokio::test]
async fn test_suspended_call_is_not_counted() {
    let notify = Arc::new(Notify::new());
    let waiting = {
        let notify = Arc::clone(&notify);
        Coroutine::new(move |(n,): (i32,), _this: This| {
            let notify = Arc::clone(&notify);
            async move {
                notify.notified().await;
                Ok::<_, String>(n)
            }
        })
    };
    let spy = Spy::new(waiting);

    let mut call = spy.invoke((7,));
    assert!(futures::poll!(&mut call).is_pending());
    assert_eq!(spy.call_count(), 0);
    assert!(spy.first_call().is_none());

    notify.notify_one();
    assert_eq!(call.await, Ok(7));
    assert!(spy.called_once());
    assert!(spy.first_call().unwrap().called_with(&(7,)));
}

#[tokio::test]
async fn test_call_record_timing() {
    let slow: Coroutine<(), (), String> = Coroutine::new(|(), _| async {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        Ok(())
    });
    let spy = Spy::new(slow);

    spy.invoke(()).await.unwrap();

    let call = spy.first_call().unwrap();
    assert!(call.duration >= std::time::Duration::from_millis(10));
    assert!(call.timestamp >= call.duration);
}
