//! A tiny hand-written module speaking the OPA WASM ABI.
//!
//! Values are NUL-terminated JSON text; a value handle is the text's address, so
//! `opa_json_dump` is the identity. Entrypoints under package `fixture`:
//!
//! | id | entrypoint            | result                                                  |
//! |----|-----------------------|---------------------------------------------------------|
//! | 0  | `fixture/allow`       | `[{"result": true}]`                                    |
//! | 1  | `fixture/violations`  | `[{"result": [{"code": "tests_failed", ...}]}]`         |
//! | 2  | `fixture/abort`       | calls `opa_abort("fixture abort")`                      |
//! | 3  | `fixture/echo`        | the input document, after an `opa_println`              |
//! | 4  | `fixture/fail`        | `eval` returns error code 1                             |

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

pub const PACKAGE: &str = "fixture";
pub const ABORT_MESSAGE: &str = "fixture abort";

pub const FIXTURE_WAT: &str = r#"
(module
  (import "env" "memory" (memory 2))
  (import "env" "opa_abort" (func $opa_abort (param i32)))
  (import "env" "opa_println" (func $opa_println (param i32)))

  (global $heap (mut i32) (i32.const 65536))

  (data (i32.const 1024) "{\"fixture/allow\":0,\"fixture/violations\":1,\"fixture/abort\":2,\"fixture/echo\":3,\"fixture/fail\":4}\00")
  (data (i32.const 2048) "[{\"result\":true}]\00")
  (data (i32.const 4096) "[{\"result\":[{\"code\":\"tests_failed\",\"msg\":\"tests must pass\"}]}]\00")
  (data (i32.const 8192) "fixture abort\00")
  (data (i32.const 12288) "echo\00")

  (func $opa_malloc (export "opa_malloc") (param $n i32) (result i32)
    (local $p i32)
    (local $end i32)
    (local.set $p (global.get $heap))
    (local.set $end (i32.add (local.get $p) (local.get $n)))
    (block $done
      (loop $grow
        (br_if $done
          (i32.le_u (local.get $end) (i32.shl (memory.size) (i32.const 16))))
        (if (i32.eq (memory.grow (i32.const 1)) (i32.const -1))
          (then unreachable))
        (br $grow)))
    (global.set $heap (local.get $end))
    (local.get $p))

  (func (export "opa_free") (param i32))

  (func (export "opa_heap_ptr_get") (result i32)
    (global.get $heap))

  (func (export "opa_heap_ptr_set") (param $p i32)
    (global.set $heap (local.get $p)))

  (func (export "opa_json_parse") (param $addr i32) (param $len i32) (result i32)
    (local $p i32)
    (if (i32.eqz (local.get $len))
      (then (return (i32.const 0))))
    (local.set $p (call $opa_malloc (i32.add (local.get $len) (i32.const 1))))
    (memory.copy (local.get $p) (local.get $addr) (local.get $len))
    (i32.store8 (i32.add (local.get $p) (local.get $len)) (i32.const 0))
    (local.get $p))

  (func (export "opa_json_dump") (param $v i32) (result i32)
    (local.get $v))

  (func (export "entrypoints") (result i32)
    (i32.const 1024))

  (func (export "opa_eval_ctx_new") (result i32)
    (local $ctx i32)
    (local.set $ctx (call $opa_malloc (i32.const 16)))
    (i32.store (local.get $ctx) (i32.const 0))
    (i32.store offset=4 (local.get $ctx) (i32.const 0))
    (i32.store offset=8 (local.get $ctx) (i32.const 0))
    (i32.store offset=12 (local.get $ctx) (i32.const 0))
    (local.get $ctx))

  (func (export "opa_eval_ctx_set_input") (param $ctx i32) (param $v i32)
    (i32.store (local.get $ctx) (local.get $v)))

  (func (export "opa_eval_ctx_set_data") (param $ctx i32) (param $v i32)
    (i32.store offset=4 (local.get $ctx) (local.get $v)))

  (func (export "opa_eval_ctx_set_entrypoint") (param $ctx i32) (param $e i32)
    (i32.store offset=8 (local.get $ctx) (local.get $e)))

  (func (export "opa_eval_ctx_get_result") (param $ctx i32) (result i32)
    (i32.load offset=12 (local.get $ctx)))

  (func (export "eval") (param $ctx i32) (result i32)
    (local $e i32)
    (local.set $e (i32.load offset=8 (local.get $ctx)))
    (if (i32.eq (local.get $e) (i32.const 0))
      (then (i32.store offset=12 (local.get $ctx) (i32.const 2048))))
    (if (i32.eq (local.get $e) (i32.const 1))
      (then (i32.store offset=12 (local.get $ctx) (i32.const 4096))))
    (if (i32.eq (local.get $e) (i32.const 2))
      (then
        (call $opa_abort (i32.const 8192))
        unreachable))
    (if (i32.eq (local.get $e) (i32.const 3))
      (then
        (call $opa_println (i32.const 12288))
        (i32.store offset=12 (local.get $ctx) (i32.load (local.get $ctx)))))
    (if (i32.eq (local.get $e) (i32.const 4))
      (then (return (i32.const 1))))
    (i32.const 0))
)
"#;

/// Imports memory but exports nothing.
pub const NO_EXPORTS_WAT: &str = r#"(module (import "env" "memory" (memory 1)))"#;

/// Imports a host function the embedded backend does not provide.
pub const UNKNOWN_IMPORT_WAT: &str =
    r#"(module (import "env" "opa_mystery" (func (param i32))) (memory (export "memory") 1))"#;

pub fn compile(wat_text: &str) -> io::Result<Vec<u8>> {
    wat::parse_str(wat_text).map_err(io::Error::other)
}

/// Compile `wat_text` and write it to `dir/name`.
pub fn write_module(dir: &Utf8Path, name: &str, wat_text: &str) -> io::Result<Utf8PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, compile(wat_text)?)?;
    Ok(path)
}

/// Write the fixture module as `dir/name`.
pub fn write_fixture(dir: &Utf8Path, name: &str) -> io::Result<Utf8PathBuf> {
    write_module(dir, name, FIXTURE_WAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_compiles() {
        let bytes = compile(FIXTURE_WAT).expect("compile fixture");
        assert_eq!(&bytes[..4], b"\0asm");
        compile(NO_EXPORTS_WAT).expect("compile no-exports");
        compile(UNKNOWN_IMPORT_WAT).expect("compile unknown-import");
    }
}
