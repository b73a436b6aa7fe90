//! Built-in capabilities
//!
//! Each installer attaches plain callable members. None of them perform
//! real I/O; `ajax` records requests instead of sending them.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SandboxResult;
use crate::registry::CapabilityRegistry;
use crate::types::Sandbox;

/// Registry preloaded with `dom`, `event`, `ajax` and `counter`
pub fn builtin_registry() -> SandboxResult<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

/// Add the built-in capabilities to an existing registry
pub fn register_builtins(registry: &mut CapabilityRegistry) -> SandboxResult<()> {
    let builtins: [(&str, &str, fn(&mut Sandbox) -> Result<()>); 4] = [
        ("dom", "element lookup and styling", install_dom),
        ("event", "attach and detach event handlers", install_event),
        ("ajax", "record outgoing requests", install_ajax),
        ("counter", "private per-sandbox counter", install_counter),
    ];
    for (name, description, installer) in builtins {
        registry.register_described(name, description, installer)?;
    }
    Ok(())
}

fn expect_args<'a>(member: &str, args: &'a [String], count: usize) -> Result<&'a [String]> {
    if args.len() != count {
        return Err(anyhow::anyhow!(
            "{member} expects {count} argument(s), got {}",
            args.len()
        ));
    }
    Ok(args)
}

fn install_dom(sandbox: &mut Sandbox) -> Result<()> {
    sandbox.attach_fn("getElement", |args| {
        let args = expect_args("getElement", args, 1)?;
        Ok(format!("<element id=\"{}\">", args[0]))
    })?;
    sandbox.attach_fn("getStyle", |args| {
        let args = expect_args("getStyle", args, 2)?;
        Ok(format!("#{} {{ {}: inherit }}", args[0], args[1]))
    })?;
    Ok(())
}

fn install_event(sandbox: &mut Sandbox) -> Result<()> {
    let handlers: Arc<Mutex<Vec<(String, String)>>> = Arc::default();

    let attached = handlers.clone();
    sandbox.attach_fn("attachEvent", move |args| {
        let args = expect_args("attachEvent", args, 2)?;
        let mut handlers = attached
            .lock()
            .map_err(|_| anyhow::anyhow!("event handler table poisoned"))?;
        handlers.push((args[0].clone(), args[1].clone()));
        Ok(format!("attached '{}' to '{}'", args[1], args[0]))
    })?;

    sandbox.attach_fn("detachEvent", move |args| {
        let args = expect_args("detachEvent", args, 1)?;
        let mut handlers = handlers
            .lock()
            .map_err(|_| anyhow::anyhow!("event handler table poisoned"))?;
        let before = handlers.len();
        handlers.retain(|(kind, _)| kind != &args[0]);
        Ok(format!(
            "detached {} handler(s) from '{}'",
            before - handlers.len(),
            args[0]
        ))
    })?;
    Ok(())
}

fn install_ajax(sandbox: &mut Sandbox) -> Result<()> {
    let last_url: Arc<Mutex<Option<String>>> = Arc::default();

    let request = last_url.clone();
    sandbox.attach_fn("makeRequest", move |args| {
        let args = expect_args("makeRequest", args, 1)?;
        *request
            .lock()
            .map_err(|_| anyhow::anyhow!("request state poisoned"))? = Some(args[0].clone());
        Ok(format!("queued GET {}", args[0]))
    })?;

    sandbox.attach_fn("getResponse", move |args| {
        expect_args("getResponse", args, 0)?;
        let last_url = last_url
            .lock()
            .map_err(|_| anyhow::anyhow!("request state poisoned"))?;
        match last_url.as_deref() {
            Some(url) => Ok(format!("200 OK {url}")),
            None => Err(anyhow::anyhow!("no request has been made")),
        }
    })?;
    Ok(())
}

fn install_counter(sandbox: &mut Sandbox) -> Result<()> {
    let count = Arc::new(AtomicU64::new(0));

    let incremented = count.clone();
    sandbox.attach_fn("increment", move |args| {
        expect_args("increment", args, 0)?;
        Ok((incremented.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    })?;
    sandbox.attach_fn("current", move |args| {
        expect_args("current", args, 0)?;
        Ok(count.load(Ordering::SeqCst).to_string())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn builtins_register_in_order() {
        let registry = builtin_registry().unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["dom", "event", "ajax", "counter"]
        );
        assert!(registry.get_capabilities().all(|c| c.description.is_some()));
    }

    #[test]
    fn register_builtins_extends_existing_registry() {
        let mut registry = CapabilityRegistry::new();
        registry.register("ajax", |_| Ok(())).unwrap();
        registry.register("storage", |_| Ok(())).unwrap();

        register_builtins(&mut registry).unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["ajax", "storage", "dom", "event", "counter"]
        );
        assemble(&registry, "ajax", |sandbox| {
            assert!(sandbox.has("makeRequest"));
        })
        .unwrap();
    }

    #[test]
    fn event_handlers_detach_by_kind() {
        let registry = builtin_registry().unwrap();
        assemble(&registry, "event", |sandbox| {
            sandbox.call("attachEvent", &args(&["click", "onClick"])).unwrap();
            sandbox.call("attachEvent", &args(&["click", "track"])).unwrap();
            let result = sandbox.call("detachEvent", &args(&["click"])).unwrap();
            assert_eq!(result, "detached 2 handler(s) from 'click'");
        })
        .unwrap();
    }

    #[test]
    fn ajax_response_follows_last_request() {
        let registry = builtin_registry().unwrap();
        assemble(&registry, "ajax", |sandbox| {
            assert!(sandbox.call("getResponse", &[]).is_err());
            sandbox.call("makeRequest", &args(&["/users"])).unwrap();
            assert_eq!(sandbox.call("getResponse", &[]).unwrap(), "200 OK /users");
        })
        .unwrap();
    }

    #[test]
    fn members_validate_argument_count() {
        let registry = builtin_registry().unwrap();
        assemble(&registry, "dom", |sandbox| {
            assert!(sandbox.call("getElement", &[]).is_err());
            assert_eq!(
                sandbox.call("getElement", &args(&["nav"])).unwrap(),
                "<element id=\"nav\">"
            );
        })
        .unwrap();
    }
}
