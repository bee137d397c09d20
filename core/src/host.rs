//! Named operations exposed to the editor host.
//!
//! The host calls operations by name with a fixed number of arguments. Each
//! call runs under the bridge's single lock, so the engine never sees two
//! calls at once. Recoverable conditions (no session, failed session
//! creation) come back as `nil`; malformed calls come back as errors.

use std::sync::Mutex;

use crate::api::RimeApi;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::handle::RimeHandle;
use crate::marshal::string_length;
use crate::value::Value;

type Entry<A> = fn(&mut RimeHandle<A>, &'static str, &[Value]) -> Result<Value>;

/// One host-callable operation.
pub struct Operation<A: RimeApi> {
    pub name: &'static str,
    pub doc: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    entry: Entry<A>,
}

impl<A: RimeApi> Operation<A> {
    fn new(
        name: &'static str,
        doc: &'static str,
        min_args: usize,
        max_args: usize,
        entry: Entry<A>,
    ) -> Self {
        Self {
            name,
            doc,
            min_args,
            max_args,
            entry,
        }
    }
}

/// The full operation table, in registration order.
pub fn operations<A: RimeApi>() -> Vec<Operation<A>> {
    vec![
        Operation::new("rime-lib-start", "Start", 2, 2, op_start),
        Operation::new("rime-lib-finalize", "Finalize", 0, 0, op_finalize),
        Operation::new("rime-lib-sync-user-data", "Sync user data.", 0, 0, op_sync_user_data),
        Operation::new("rime-lib-get-sync-dir", "Get sync directory.", 0, 0, op_get_sync_dir),
        Operation::new("rime-lib-get-context", "Get context.", 0, 0, op_get_context),
        Operation::new("rime-lib-get-input", "Get input.", 0, 0, op_get_input),
        Operation::new("rime-lib-get-commit", "Get commit.", 0, 0, op_get_commit),
        Operation::new(
            "rime-lib-clear-composition",
            "Clear composition.",
            0,
            0,
            op_clear_composition,
        ),
        Operation::new("rime-lib-process-key", "Process key.", 2, 2, op_process_key),
        Operation::new("rime-lib-select-schema", "Select schema", 1, 1, op_select_schema),
        Operation::new(
            "rime-lib-get-schema-list",
            "Get schema list.",
            0,
            0,
            op_get_schema_list,
        ),
        Operation::new(
            "rime-lib-string-length",
            "Get length of string",
            1,
            1,
            op_string_length,
        ),
    ]
}

/// The engine handle plus its operation table.
///
/// `Sync` whenever the engine is `Send`, so one bridge can serve callers on
/// several threads.
pub struct Bridge<A: RimeApi> {
    handle: Mutex<RimeHandle<A>>,
    ops: Vec<Operation<A>>,
}

impl<A: RimeApi> Bridge<A> {
    /// Attach to the engine returned by `load`.
    ///
    /// If the engine cannot be loaded no bridge is built, so no operation is
    /// ever installed.
    pub fn attach<F>(load: F, config: BridgeConfig) -> Result<Self>
    where
        F: FnOnce(&BridgeConfig) -> Result<A>,
    {
        let api = load(&config).map_err(|e| match e {
            BridgeError::Unavailable(_) => e,
            other => BridgeError::Unavailable(other.to_string()),
        })?;
        Ok(Self::new(RimeHandle::with_config(api, config)))
    }

    pub fn new(handle: RimeHandle<A>) -> Self {
        Self {
            handle: Mutex::new(handle),
            ops: operations(),
        }
    }

    pub fn operations(&self) -> &[Operation<A>] {
        &self.ops
    }

    /// Run `f` with exclusive access to the handle.
    pub fn with_handle<R>(&self, f: impl FnOnce(&mut RimeHandle<A>) -> R) -> R {
        let mut handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut handle)
    }

    /// Call an operation by name.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let op = self
            .ops
            .iter()
            .find(|op| op.name == name)
            .ok_or_else(|| BridgeError::UnknownOperation(name.to_string()))?;

        if args.len() < op.min_args || args.len() > op.max_args {
            tracing::warn!(op = op.name, got = args.len(), "wrong number of arguments");
            return Err(BridgeError::Arity {
                op: op.name,
                min: op.min_args,
                max: op.max_args,
                got: args.len(),
            });
        }

        tracing::trace!(op = op.name, "call");
        let result = self.with_handle(|handle| (op.entry)(handle, op.name, args));
        match result {
            Err(e @ (BridgeError::NoSession | BridgeError::SessionCreation)) => {
                tracing::warn!(op = op.name, error = %e, "returning nil");
                Ok(Value::Nil)
            }
            other => other,
        }
    }
}

fn arg_str<'a>(op: &'static str, args: &'a [Value], index: usize) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or(BridgeError::ArgumentType {
            op,
            index,
            expected: "a string",
        })
}

fn arg_int(op: &'static str, args: &[Value], index: usize) -> Result<i32> {
    args.get(index)
        .and_then(Value::as_int)
        .and_then(|i| i32::try_from(i).ok())
        .ok_or(BridgeError::ArgumentType {
            op,
            index,
            expected: "a 32-bit integer",
        })
}

fn op_start<A: RimeApi>(h: &mut RimeHandle<A>, op: &'static str, args: &[Value]) -> Result<Value> {
    let shared_data_dir = arg_str(op, args, 0)?;
    let user_data_dir = arg_str(op, args, 1)?;
    h.start(shared_data_dir, user_data_dir)?;
    Ok(Value::T)
}

fn op_finalize<A: RimeApi>(h: &mut RimeHandle<A>, _: &'static str, _: &[Value]) -> Result<Value> {
    h.finalize();
    Ok(Value::T)
}

fn op_sync_user_data<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    Ok(h.sync_user_data().into())
}

fn op_get_sync_dir<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    Ok(h.get_sync_dir().into())
}

fn op_get_context<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    Ok(h.get_context()?.into())
}

fn op_get_input<A: RimeApi>(h: &mut RimeHandle<A>, _: &'static str, _: &[Value]) -> Result<Value> {
    Ok(h.get_input()?.into())
}

fn op_get_commit<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    Ok(h.get_commit()?.into())
}

fn op_clear_composition<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    h.clear_composition()?;
    Ok(Value::T)
}

fn op_process_key<A: RimeApi>(
    h: &mut RimeHandle<A>,
    op: &'static str,
    args: &[Value],
) -> Result<Value> {
    let keycode = arg_int(op, args, 0)?;
    let mask = arg_int(op, args, 1)?;
    Ok(h.process_key(keycode, mask)?.into())
}

fn op_select_schema<A: RimeApi>(
    h: &mut RimeHandle<A>,
    op: &'static str,
    args: &[Value],
) -> Result<Value> {
    let schema_id = arg_str(op, args, 0)?;
    Ok(h.select_schema(schema_id)?.into())
}

fn op_get_schema_list<A: RimeApi>(
    h: &mut RimeHandle<A>,
    _: &'static str,
    _: &[Value],
) -> Result<Value> {
    Ok(h.get_schema_list().into())
}

fn op_string_length<A: RimeApi>(
    _: &mut RimeHandle<A>,
    op: &'static str,
    args: &[Value],
) -> Result<Value> {
    Ok(string_length(arg_str(op, args, 0)?).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRime;

    fn bridge() -> Bridge<MockRime> {
        Bridge::new(RimeHandle::new(MockRime::new()))
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_every_operation_registered_once() {
        let b = bridge();
        let mut names: Vec<_> = b.operations().iter().map(|op| op.name).collect();
        assert_eq!(names.len(), 12);
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn test_attach_failure_installs_nothing() {
        let result = Bridge::<MockRime>::attach(
            |_| Err(BridgeError::Unavailable("librime.so.1 not found".to_string())),
            BridgeConfig::default(),
        );
        assert!(matches!(result, Err(BridgeError::Unavailable(_))));
    }

    #[test]
    fn test_attach_success() {
        let b = Bridge::attach(|_| Ok(MockRime::new()), BridgeConfig::default()).unwrap();
        assert_eq!(
            b.call("rime-lib-start", &[s("/s"), s("/u")]).unwrap(),
            Value::T
        );
    }

    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_bridge_is_shareable() {
        assert_sync::<Bridge<MockRime>>();
        assert_sync::<Bridge<Box<dyn RimeApi + Send>>>();

        let b = std::sync::Arc::new(bridge());
        b.call("rime-lib-start", &[s("/s"), s("/u")]).unwrap();
        let worker = {
            let b = std::sync::Arc::clone(&b);
            std::thread::spawn(move || {
                b.call("rime-lib-process-key", &[Value::Int(97), Value::Int(0)])
                    .unwrap()
            })
        };
        assert_eq!(worker.join().unwrap(), Value::T);
        assert_eq!(b.call("rime-lib-get-input", &[]).unwrap(), s("a"));
    }

    #[test]
    fn test_unknown_operation() {
        assert!(matches!(
            bridge().call("rime-lib-frobnicate", &[]),
            Err(BridgeError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_arity_checked() {
        match bridge().call("rime-lib-process-key", &[Value::Int(97)]) {
            Err(BridgeError::Arity { min: 2, max: 2, got: 1, .. }) => {}
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_types_checked() {
        let b = bridge();
        b.call("rime-lib-start", &[s("/s"), s("/u")]).unwrap();
        assert!(matches!(
            b.call("rime-lib-process-key", &[s("a"), Value::Int(0)]),
            Err(BridgeError::ArgumentType { index: 0, .. })
        ));
        assert!(matches!(
            b.call("rime-lib-process-key", &[Value::Int(i64::MAX), Value::Int(0)]),
            Err(BridgeError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn test_no_session_is_nil() {
        let b = bridge();
        assert_eq!(
            b.call("rime-lib-process-key", &[Value::Int(97), Value::Int(0)]).unwrap(),
            Value::Nil
        );
        assert_eq!(b.call("rime-lib-get-context", &[]).unwrap(), Value::Nil);
        assert_eq!(b.call("rime-lib-clear-composition", &[]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_string_length() {
        let b = bridge();
        assert_eq!(
            b.call("rime-lib-string-length", &[s("你好a")]).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn test_failed_start_is_nil() {
        let mock = MockRime::new();
        mock.refuse_sessions(true);
        let b = Bridge::new(RimeHandle::new(mock));
        assert_eq!(
            b.call("rime-lib-start", &[s("/s"), s("/u")]).unwrap(),
            Value::Nil
        );
    }
}
