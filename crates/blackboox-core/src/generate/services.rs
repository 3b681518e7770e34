//! Dual-target service codegen.
//!
//! From the services registry this renders, in one pass:
//! - the host dispatcher module, which builds the service map and routes
//!   `(service, method, ...args)` calls arriving on the `service:call` channel,
//! - the client proxy module, one accessor per service returning a
//!   capability object that forwards every call over the bridge,
//! - the ambient declarations for those accessors.
//!
//! The proxy and the dispatcher are rendered from the same entry list, so
//! the service names they expose are always identical.

use super::declarations::{relative_specifier, type_of_import};
use crate::registry::{ExportShape, ImportEntry, Registry};
use crate::version::GENERATED_HEADER;
use blackboox_proto::{BRIDGE_GLOBAL, SERVICE_CALL_CHANNEL};
use std::fmt::Write;
use std::path::Path;

/// JS string literal.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Local binding the host module imports a service under.
fn binding(entry: &ImportEntry) -> String {
    format!("__service_{}", entry.name)
}

const HOST_PRELUDE: &str = r"
export function defineService<T extends Record<string, (...args: any[]) => unknown>>(service: T) {
  return () => service
}

export class ServiceNotFound extends Error {
  constructor(readonly service: string) {
    super(`Cannot find service named ${service}`)
    this.name = 'ServiceNotFound'
  }
}

export class MethodNotFound extends Error {
  constructor(readonly service: string, readonly method: string) {
    super(`Cannot find method named ${method} in service ${service}`)
    this.name = 'MethodNotFound'
  }
}

type ServiceMap = Record<string, Record<string, (...args: any[]) => unknown>>

export function createDispatcher(services: ServiceMap) {
  return async (name: string, method: string, ...args: unknown[]) => {
    if (!Object.prototype.hasOwnProperty.call(services, name)) throw new ServiceNotFound(name)
    const service = services[name]
    if (typeof service[method] !== 'function') throw new MethodNotFound(name, method)
    return service[method](...args)
  }
}

const resolveService = (value: any) => (typeof value === 'function' ? value() : value)
";

/// `dev/electron/index.ts`: the host dispatcher and its service map.
#[must_use]
pub fn render_host_entry(services: &Registry, entry_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nimport { ipcMain } from 'electron'\n");

    for entry in services.all() {
        let from = relative_specifier(entry_dir, entry);
        if entry.is_default_export {
            let _ = writeln!(out, "import {} from '{from}'", binding(entry));
        } else {
            let _ = writeln!(out, "import {{ {} as {} }} from '{from}'", entry.name, binding(entry));
        }
    }

    out.push_str(HOST_PRELUDE);

    let channel = quote(SERVICE_CALL_CHANNEL);
    let _ = write!(
        out,
        r"
export function initializeServices(services: ServiceMap) {{
  const dispatch = createDispatcher(services)
  ipcMain.handle({channel}, (_event, name: string, method: string, ...args: unknown[]) =>
    dispatch(name, method, ...args)
  )
  return () => ipcMain.removeHandler({channel})
}}
"
    );

    out.push_str("\nexport const setupServices = () =>\n  initializeServices({\n");
    for entry in services.all() {
        let value = match entry.shape {
            ExportShape::Object { .. } => binding(entry),
            ExportShape::Factory { .. } => format!("{}()", binding(entry)),
            ExportShape::Opaque => format!("resolveService({})", binding(entry)),
        };
        let _ = writeln!(out, "    {}: {value},", quote(&entry.name));
    }
    out.push_str("  })\n");
    out
}

/// `dev/client/useService.mjs`: one accessor per service.
#[must_use]
pub fn render_client_proxy(services: &Registry) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    let _ = write!(
        out,
        r"
const bridge = window[{global}].ipcRenderer

function callService(service, method, ...args) {{
  return bridge.callService(service, method, ...args)
}}

const services = {{",
        global = quote(BRIDGE_GLOBAL)
    );

    if services.is_empty() {
        out.push_str("}\n");
    } else {
        out.push('\n');
        for entry in services.all() {
            let service = quote(&entry.name);
            let _ = writeln!(out, "  {service}: Object.freeze({{");
            match entry.shape.methods() {
                Some(methods) => {
                    for method in methods {
                        let method = quote(method);
                        let _ = writeln!(
                            out,
                            "    {method}: (...args) => callService({service}, {method}, ...args),"
                        );
                    }
                }
                None => {
                    let _ = writeln!(
                        out,
                        "    invoke: (method, ...args) => callService({service}, method, ...args),"
                    );
                }
            }
            out.push_str("  }),\n");
        }
        out.push_str("}\n");
    }

    out.push_str("\nexport function useService(name) {\n  return services[name]\n}\n");
    if !services.is_empty() {
        out.push('\n');
    }
    for entry in services.all() {
        let _ = writeln!(
            out,
            "export const {} = () => services[{}]",
            entry.name,
            quote(&entry.name)
        );
    }
    out
}

const SERVICE_TYPES: &str = r"
type ServiceOf<T> = T extends (...args: any[]) => infer R ? R : T
type Remote<T> = {
  [K in keyof T]: T[K] extends (...args: infer A) => infer R ? (...args: A) => Promise<Awaited<R>> : never
}
type Invoker = { invoke: (method: string, ...args: unknown[]) => Promise<unknown> }
";

/// `types/services.d.ts`: one ambient accessor declaration per service.
#[must_use]
pub fn render_service_declarations(services: &Registry, declaration_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nexport {}\n");
    out.push_str(SERVICE_TYPES);
    out.push_str("\ndeclare global {\n");
    for entry in services.all() {
        let capability = if entry.shape.methods().is_some() {
            format!(
                "Remote<ServiceOf<{}>>",
                type_of_import(declaration_dir, entry)
            )
        } else {
            "Invoker".to_string()
        };
        let _ = writeln!(out, "  const {}: () => {capability}", entry.name);
    }
    out.push_str("}\n");
    out
}
