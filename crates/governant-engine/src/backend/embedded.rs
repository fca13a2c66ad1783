//! In-process execution of compiled policy modules.

/// Whether this build can execute modules in-process.
pub const EMBEDDED_AVAILABLE: bool = cfg!(feature = "embedded");

pub use imp::EmbeddedBackend;

#[cfg(feature = "embedded")]
mod imp {
    use camino::{Utf8Path, Utf8PathBuf};
    use governant_types::Entrypoint;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::fmt;
    use wasmtime::{
        Caller, Engine, ExternType, Instance, Linker, Memory, MemoryType, Module, Store,
        TypedFunc, WasmParams, WasmResults,
    };

    use crate::artifact::Artifact;
    use crate::backend::{Backend, BackendKind};
    use crate::bundle::read_module_bytes;
    use crate::error::{PolicyError, PolicyResult};

    const EMPTY_DATA: &[u8] = b"{}";

    #[derive(Default)]
    struct HostState {
        memory: Option<Memory>,
        abort: Option<String>,
    }

    struct Exports {
        malloc: TypedFunc<i32, i32>,
        heap_ptr_get: TypedFunc<(), i32>,
        heap_ptr_set: TypedFunc<i32, ()>,
        json_parse: TypedFunc<(i32, i32), i32>,
        json_dump: TypedFunc<i32, i32>,
        eval_ctx_new: TypedFunc<(), i32>,
        eval_ctx_set_input: TypedFunc<(i32, i32), ()>,
        eval_ctx_set_data: TypedFunc<(i32, i32), ()>,
        eval_ctx_set_entrypoint: TypedFunc<(i32, i32), ()>,
        eval_ctx_get_result: TypedFunc<i32, i32>,
        eval: TypedFunc<i32, i32>,
        entrypoints: TypedFunc<(), i32>,
    }

    impl Exports {
        fn lookup(instance: &Instance, store: &mut Store<HostState>) -> PolicyResult<Self> {
            Ok(Self {
                malloc: typed(instance, store, "opa_malloc")?,
                heap_ptr_get: typed(instance, store, "opa_heap_ptr_get")?,
                heap_ptr_set: typed(instance, store, "opa_heap_ptr_set")?,
                json_parse: typed(instance, store, "opa_json_parse")?,
                json_dump: typed(instance, store, "opa_json_dump")?,
                eval_ctx_new: typed(instance, store, "opa_eval_ctx_new")?,
                eval_ctx_set_input: typed(instance, store, "opa_eval_ctx_set_input")?,
                eval_ctx_set_data: typed(instance, store, "opa_eval_ctx_set_data")?,
                eval_ctx_set_entrypoint: typed(instance, store, "opa_eval_ctx_set_entrypoint")?,
                eval_ctx_get_result: typed(instance, store, "opa_eval_ctx_get_result")?,
                eval: typed(instance, store, "eval")?,
                entrypoints: typed(instance, store, "entrypoints")?,
            })
        }
    }

    fn typed<P: WasmParams, R: WasmResults>(
        instance: &Instance,
        store: &mut Store<HostState>,
        name: &'static str,
    ) -> PolicyResult<TypedFunc<P, R>> {
        let func = instance
            .get_func(&mut *store, name)
            .ok_or(PolicyError::MissingExport(name))?;
        func.typed::<P, R>(&*store)
            .map_err(|e| malformed(format!("export {name} has an unexpected signature: {e}")))
    }

    /// One instantiated module plus the handles evaluation needs.
    struct Vm {
        store: Store<HostState>,
        memory: Memory,
        exports: Exports,
        data: i32,
        base_heap: i32,
    }

    impl Vm {
        fn read_cstr(&self, addr: i32) -> PolicyResult<String> {
            read_cstr(self.memory.data(&self.store), addr)
        }

        fn read_json(&mut self, value: i32) -> PolicyResult<Value> {
            let addr = self
                .exports
                .json_dump
                .call(&mut self.store, value)
                .map_err(|e| self.failed("opa_json_dump", e))?;
            let text = self.read_cstr(addr)?;
            serde_json::from_str(&text).map_err(|e| PolicyError::MalformedOutput {
                reason: format!("module returned invalid JSON: {e}"),
            })
        }

        fn write_json(&mut self, bytes: &[u8]) -> PolicyResult<i32> {
            let len = i32::try_from(bytes.len()).map_err(|_| PolicyError::InvalidInput {
                reason: format!("document too large ({} bytes)", bytes.len()),
            })?;
            let addr = self
                .exports
                .malloc
                .call(&mut self.store, len)
                .map_err(|e| self.failed("opa_malloc", e))?;
            self.memory
                .write(&mut self.store, addr as u32 as usize, bytes)
                .map_err(|e| PolicyError::EvalFailed {
                    reason: format!("write to module memory: {e}"),
                })?;
            let parsed = self
                .exports
                .json_parse
                .call(&mut self.store, (addr, len))
                .map_err(|e| self.failed("opa_json_parse", e))?;
            if parsed == 0 {
                return Err(PolicyError::InvalidInput {
                    reason: "module rejected the document".to_string(),
                });
            }
            Ok(parsed)
        }

        /// Prefer the message the module passed to `opa_abort` over the trap text.
        fn failed(&mut self, step: &str, err: wasmtime::Error) -> PolicyError {
            let reason = match self.store.data_mut().abort.take() {
                Some(msg) => format!("module aborted: {msg}"),
                None => format!("{step}: {err:#}"),
            };
            PolicyError::EvalFailed { reason }
        }

        fn run(&mut self, entrypoint: i32, input: &[u8]) -> PolicyResult<Value> {
            let input = self.write_json(input)?;
            let ctx = self
                .exports
                .eval_ctx_new
                .call(&mut self.store, ())
                .map_err(|e| self.failed("opa_eval_ctx_new", e))?;
            let data = self.data;
            self.exports
                .eval_ctx_set_input
                .call(&mut self.store, (ctx, input))
                .map_err(|e| self.failed("opa_eval_ctx_set_input", e))?;
            self.exports
                .eval_ctx_set_data
                .call(&mut self.store, (ctx, data))
                .map_err(|e| self.failed("opa_eval_ctx_set_data", e))?;
            self.exports
                .eval_ctx_set_entrypoint
                .call(&mut self.store, (ctx, entrypoint))
                .map_err(|e| self.failed("opa_eval_ctx_set_entrypoint", e))?;

            let code = self
                .exports
                .eval
                .call(&mut self.store, ctx)
                .map_err(|e| self.failed("eval", e))?;
            if code != 0 {
                return Err(PolicyError::EvalFailed {
                    reason: format!("eval returned error code {code}"),
                });
            }

            let result = self
                .exports
                .eval_ctx_get_result
                .call(&mut self.store, ctx)
                .map_err(|e| self.failed("opa_eval_ctx_get_result", e))?;
            self.read_json(result)
        }
    }

    /// Restores the heap pointer to the post-load base when dropped, so scratch allocations
    /// never outlive a call.
    struct HeapScope<'a> {
        vm: &'a mut Vm,
    }

    impl<'a> HeapScope<'a> {
        fn enter(vm: &'a mut Vm) -> Self {
            vm.store.data_mut().abort = None;
            Self { vm }
        }
    }

    impl Drop for HeapScope<'_> {
        fn drop(&mut self) {
            let base = self.vm.base_heap;
            if let Err(e) = self.vm.exports.heap_ptr_set.call(&mut self.vm.store, base) {
                tracing::warn!(error = %e, "failed to reset module heap");
            }
        }
    }

    /// Executes a compiled module in a wasmtime sandbox.
    ///
    /// The module is compiled and instantiated once; calls are serialized on an internal lock.
    pub struct EmbeddedBackend {
        module_path: Utf8PathBuf,
        entrypoints: BTreeMap<String, i32>,
        vm: Mutex<Vm>,
    }

    impl fmt::Debug for EmbeddedBackend {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("EmbeddedBackend")
                .field("module_path", &self.module_path)
                .field("entrypoints", &self.entrypoints)
                .finish_non_exhaustive()
        }
    }

    impl EmbeddedBackend {
        pub fn new(artifact: &Artifact) -> PolicyResult<Self> {
            let bytes = read_module_bytes(artifact)?;
            Self::from_bytes(artifact.path(), &bytes)
        }

        pub fn from_bytes(module_path: &Utf8Path, bytes: &[u8]) -> PolicyResult<Self> {
            let engine = Engine::new(&wasmtime::Config::default()).map_err(|e| {
                PolicyError::BackendUnavailable {
                    reason: format!("wasmtime engine: {e:#}"),
                }
            })?;
            let module = Module::new(&engine, bytes).map_err(|e| malformed(format!("{e:#}")))?;

            let memory_ty = module
                .imports()
                .find_map(|import| match import.ty() {
                    ExternType::Memory(ty)
                        if import.module() == "env" && import.name() == "memory" =>
                    {
                        Some(ty)
                    }
                    _ => None,
                })
                .unwrap_or_else(|| MemoryType::new(2, None));

            let mut store = Store::new(&engine, HostState::default());
            let memory =
                Memory::new(&mut store, memory_ty).map_err(|e| malformed(format!("{e:#}")))?;
            store.data_mut().memory = Some(memory);

            let linker = host_linker(&engine, &store, memory)?;
            let instance = linker
                .instantiate(&mut store, &module)
                .map_err(|e| malformed(format!("instantiate: {e:#}")))?;
            let exports = Exports::lookup(&instance, &mut store)?;

            let mut vm = Vm {
                store,
                memory,
                exports,
                data: 0,
                base_heap: 0,
            };

            let table = vm
                .exports
                .entrypoints
                .call(&mut vm.store, ())
                .map_err(|e| vm.failed("entrypoints", e))?;
            let entrypoints = parse_entrypoints(&vm.read_json(table)?)?;

            vm.data = vm.write_json(EMPTY_DATA)?;
            vm.base_heap = vm
                .exports
                .heap_ptr_get
                .call(&mut vm.store, ())
                .map_err(|e| vm.failed("opa_heap_ptr_get", e))?;

            tracing::debug!(
                module = %module_path,
                entrypoints = entrypoints.len(),
                "embedded module loaded"
            );
            Ok(Self {
                module_path: module_path.to_path_buf(),
                entrypoints,
                vm: Mutex::new(vm),
            })
        }

        /// Entrypoints compiled into the module, in slash form.
        pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
            self.entrypoints.keys().map(String::as_str)
        }

        /// Current heap pointer. Between calls it always equals the post-load base.
        pub fn heap_ptr(&self) -> PolicyResult<u32> {
            let mut vm = self.vm.lock();
            let vm = &mut *vm;
            let ptr = vm
                .exports
                .heap_ptr_get
                .call(&mut vm.store, ())
                .map_err(|e| vm.failed("opa_heap_ptr_get", e))?;
            Ok(ptr as u32)
        }
    }

    impl Backend for EmbeddedBackend {
        fn evaluate(&self, entrypoint: &Entrypoint, input: &Value) -> PolicyResult<Value> {
            let id = *self
                .entrypoints
                .get(&entrypoint.as_module_path())
                .ok_or_else(|| PolicyError::UnknownEntrypoint(entrypoint.to_string()))?;
            let body = serde_json::to_vec(input).map_err(|e| PolicyError::InvalidInput {
                reason: e.to_string(),
            })?;

            let mut vm = self.vm.lock();
            let mut scope = HeapScope::enter(&mut vm);
            let raw = scope.vm.run(id, &body)?;
            tracing::debug!(entrypoint = %entrypoint, "embedded evaluation finished");
            Ok(raw)
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Embedded
        }
    }

    fn host_linker(
        engine: &Engine,
        store: &Store<HostState>,
        memory: Memory,
    ) -> PolicyResult<Linker<HostState>> {
        let mut linker = Linker::new(engine);
        let link_err = |e: wasmtime::Error| malformed(format!("link host imports: {e:#}"));

        linker.define(store, "env", "memory", memory).map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_abort",
                |mut caller: Caller<'_, HostState>, addr: i32| -> wasmtime::Result<()> {
                    let msg = caller_cstr(&caller, addr);
                    caller.data_mut().abort = Some(msg.clone());
                    Err(wasmtime::Error::msg(format!("opa_abort: {msg}")))
                },
            )
            .map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_println",
                |caller: Caller<'_, HostState>, addr: i32| {
                    let msg = caller_cstr(&caller, addr);
                    tracing::debug!(target: "governant::policy", "{msg}");
                },
            )
            .map_err(link_err)?;

        linker
            .func_wrap("env", "opa_builtin0", |id: i32, _ctx: i32| -> wasmtime::Result<i32> {
                Err(unsupported_builtin(id))
            })
            .map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_builtin1",
                |id: i32, _ctx: i32, _a: i32| -> wasmtime::Result<i32> {
                    Err(unsupported_builtin(id))
                },
            )
            .map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_builtin2",
                |id: i32, _ctx: i32, _a: i32, _b: i32| -> wasmtime::Result<i32> {
                    Err(unsupported_builtin(id))
                },
            )
            .map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_builtin3",
                |id: i32, _ctx: i32, _a: i32, _b: i32, _c: i32| -> wasmtime::Result<i32> {
                    Err(unsupported_builtin(id))
                },
            )
            .map_err(link_err)?;
        linker
            .func_wrap(
                "env",
                "opa_builtin4",
                |id: i32, _ctx: i32, _a: i32, _b: i32, _c: i32, _d: i32| -> wasmtime::Result<i32> {
                    Err(unsupported_builtin(id))
                },
            )
            .map_err(link_err)?;

        Ok(linker)
    }

    fn unsupported_builtin(id: i32) -> wasmtime::Error {
        wasmtime::Error::msg(format!("host builtin {id} is not provided"))
    }

    fn caller_cstr(caller: &Caller<'_, HostState>, addr: i32) -> String {
        match caller.data().memory {
            Some(memory) => read_cstr(memory.data(caller), addr)
                .unwrap_or_else(|_| format!("<unreadable message at {addr:#x}>")),
            None => String::new(),
        }
    }

    fn read_cstr(mem: &[u8], addr: i32) -> PolicyResult<String> {
        let start = addr as u32 as usize;
        let tail = mem.get(start..).ok_or_else(|| PolicyError::MalformedOutput {
            reason: format!("address {start:#x} outside module memory"),
        })?;
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| PolicyError::MalformedOutput {
                reason: format!("unterminated string at {start:#x}"),
            })?;
        Ok(String::from_utf8_lossy(&tail[..len]).into_owned())
    }

    fn parse_entrypoints(table: &Value) -> PolicyResult<BTreeMap<String, i32>> {
        let map = table
            .as_object()
            .ok_or_else(|| malformed("entrypoint table is not an object".to_string()))?;
        map.iter()
            .map(|(name, id)| -> PolicyResult<(String, i32)> {
                let id = id
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| malformed(format!("entrypoint {name} has invalid id {id}")))?;
                Ok((name.trim_start_matches('/').to_string(), id))
            })
            .collect()
    }

    fn malformed(reason: String) -> PolicyError {
        PolicyError::MalformedModule { reason }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn reads_nul_terminated_strings() {
            let mem = b"xx{\"a\":1}\0rest";
            assert_eq!(read_cstr(mem, 2).expect("read"), "{\"a\":1}");
            assert!(read_cstr(mem, 100).is_err());
            assert!(read_cstr(b"abc", 0).is_err());
        }

        #[test]
        fn parses_entrypoint_table() {
            let table = json!({"github/deploy/allow": 0, "/github/deploy/violations": 1});
            let parsed = parse_entrypoints(&table).expect("parse");
            assert_eq!(parsed.get("github/deploy/allow"), Some(&0));
            assert_eq!(parsed.get("github/deploy/violations"), Some(&1));

            assert!(parse_entrypoints(&json!([])).is_err());
            assert!(parse_entrypoints(&json!({"x": "zero"})).is_err());
        }

        #[test]
        fn rejects_bytes_that_are_not_a_module() {
            let err = EmbeddedBackend::from_bytes(Utf8Path::new("junk.wasm"), b"not wasm")
                .unwrap_err();
            assert!(matches!(err, PolicyError::MalformedModule { .. }));
        }
    }
}

#[cfg(not(feature = "embedded"))]
mod imp {
    use governant_types::Entrypoint;
    use serde_json::Value;
    use std::convert::Infallible;

    use crate::artifact::Artifact;
    use crate::backend::{Backend, BackendKind};
    use crate::error::{PolicyError, PolicyResult};

    /// Placeholder for builds without the `embedded` feature; it can never be constructed.
    #[derive(Debug)]
    pub struct EmbeddedBackend {
        never: Infallible,
    }

    impl EmbeddedBackend {
        pub fn new(_artifact: &Artifact) -> PolicyResult<Self> {
            Err(PolicyError::BackendUnavailable {
                reason: "built without the `embedded` feature".to_string(),
            })
        }
    }

    impl Backend for EmbeddedBackend {
        fn evaluate(&self, _entrypoint: &Entrypoint, _input: &Value) -> PolicyResult<Value> {
            match self.never {}
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Embedded
        }
    }
}
