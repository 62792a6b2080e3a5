use crate::context::{CompileOptions, CompilerContext};
use crate::error::{CompileError, CompileResult};
use crate::naming;
use crate::plan::{plan_decode, plan_encode, wrap_value, Access, ReadCall, WriteCall};
use crate::types::{map_type, HostType};
use busgen_introspect::{Arg, Interface, IntrospectionNode, Method, Property, Signal};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Compile an introspection document to Rust client stubs
pub fn compile_document(
    document: &IntrospectionNode,
    options: CompileOptions,
) -> CompileResult<String> {
    let ctx = CompilerContext::new(options);
    let body = ctx.with_new_buffer();

    let interfaces = unique_interfaces(document);
    info!(
        node = %document.name,
        interfaces = interfaces.len(),
        "Compiling introspection document"
    );

    let mut type_names = Names::new("document");
    for (index, interface) in interfaces.iter().enumerate() {
        if index > 0 {
            body.add("\n");
        }
        compile_interface(interface, &body, &mut type_names)?;
    }

    compile_header(&ctx, !interfaces.is_empty());
    ctx.merge_buffer(&body);
    Ok(ctx.get_output())
}

/// Parse and compile in one step
pub fn compile_xml(xml: &str, options: CompileOptions) -> CompileResult<String> {
    let document = busgen_introspect::parse(xml)?;
    compile_document(&document, options)
}

/// Interfaces in depth-first document order, first declaration winning
fn unique_interfaces(document: &IntrospectionNode) -> Vec<&Interface> {
    let mut seen: HashMap<&str, &Interface> = HashMap::new();
    let mut unique = Vec::new();
    for interface in document.all_interfaces() {
        match seen.get(interface.name.as_str()) {
            Some(first) => {
                if *first != interface {
                    warn!(
                        interface = %interface.name,
                        "Interface declared twice with different members, keeping the first"
                    );
                }
            }
            None => {
                seen.insert(&interface.name, interface);
                unique.push(interface);
            }
        }
    }
    unique
}

fn compile_header(ctx: &CompilerContext, has_body: bool) {
    if ctx.options.emit_header {
        match &ctx.options.source_name {
            Some(source) => ctx.add_line(&format!(
                "// Generated by busgen from {}. Do not edit.",
                source
            )),
            None => ctx.add_line("// Generated by busgen. Do not edit."),
        }
        if has_body {
            ctx.add("\n");
        }
    }

    let imports = ctx.imports();
    if !imports.is_empty() {
        ctx.add_line(&format!(
            "use {}::{{{}}};",
            ctx.options.runtime_crate,
            imports.join(", ")
        ));
        ctx.add("\n");
    }
}

/// Identifiers already taken in one Rust scope
struct Names {
    scope: String,
    taken: HashSet<String>,
}

impl Names {
    fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            taken: HashSet::new(),
        }
    }

    fn claim(&mut self, name: &str) -> CompileResult<()> {
        if self.taken.insert(name.to_string()) {
            Ok(())
        } else {
            Err(CompileError::collision(&self.scope, name))
        }
    }
}

/// A result or event record emitted into the interface's module
struct Record {
    name: String,
    fields: Vec<(String, HostType)>,
}

/// Per-interface compilation state
struct InterfaceUnit<'a> {
    interface: &'a Interface,
    type_name: String,
    module: String,
    members: Names,
    record_names: Names,
    records: Vec<Record>,
    camel_case: bool,
}

impl<'a> InterfaceUnit<'a> {
    fn new(interface: &'a Interface) -> CompileResult<Self> {
        let type_name = naming::type_name(&interface.name);
        let module = naming::module_name(&type_name);
        let mut members = Names::new(type_name.clone());
        members.claim("new")?;
        Ok(Self {
            interface,
            record_names: Names::new(module.clone()),
            type_name,
            module,
            members,
            records: Vec::new(),
            camel_case: false,
        })
    }

    fn claim_member(&mut self, name: &str) -> CompileResult<()> {
        self.members.claim(name)?;
        self.note_identifier(name);
        Ok(())
    }

    fn note_identifier(&mut self, name: &str) {
        if name.chars().any(char::is_uppercase) {
            self.camel_case = true;
        }
    }

    /// Register a record and return the path stubs refer to it by
    fn add_record(&mut self, name: String, fields: Vec<(String, HostType)>) -> CompileResult<String> {
        self.record_names.claim(&name)?;
        let path = format!("{}::{}", self.module, name);
        self.records.push(Record { name, fields });
        Ok(path)
    }

    fn in_member<T>(&self, member: &str, result: CompileResult<T>) -> CompileResult<T> {
        result.map_err(|error| error.in_member(&self.interface.name, member))
    }
}

fn compile_interface(
    interface: &Interface,
    ctx: &CompilerContext,
    type_names: &mut Names,
) -> CompileResult<()> {
    let mut unit = InterfaceUnit::new(interface)?;
    type_names.claim(&unit.type_name)?;
    type_names.claim(&unit.module)?;

    debug!(
        interface = %interface.name,
        type_name = %unit.type_name,
        methods = interface.methods.len(),
        signals = interface.signals.len(),
        properties = interface.properties.len(),
        "Compiling interface"
    );

    ctx.use_item("Connection");
    ctx.add_line("#[derive(Debug, Clone)]");
    if naming::is_lower_camel(&unit.type_name) {
        ctx.add_line("#[allow(non_camel_case_types)]");
    }
    ctx.add_line(&format!("pub struct {} {{", unit.type_name));
    ctx.indent();
    ctx.add_line("bus: Connection,");
    ctx.add_line("destination: String,");
    ctx.add_line("path: String,");
    ctx.dedent();
    ctx.add_line("}");
    ctx.add("\n");

    // Members go to their own buffer so the impl header can depend on them
    let members = ctx.with_new_buffer();
    members.indent();
    compile_constructor(&unit, &members);
    for method in &interface.methods {
        members.add("\n");
        compile_method(method, &mut unit, &members)?;
    }
    for signal in &interface.signals {
        members.add("\n");
        compile_signal(signal, &mut unit, &members)?;
    }
    for property in &interface.properties {
        compile_property(property, &mut unit, &members)?;
    }
    members.dedent();

    if unit.camel_case {
        ctx.add_line("#[allow(non_snake_case)]");
    }
    ctx.add_line(&format!("impl {} {{", unit.type_name));
    ctx.merge_buffer(&members);
    ctx.add_line("}");

    compile_records(&unit, ctx);
    Ok(())
}

fn compile_constructor(unit: &InterfaceUnit, ctx: &CompilerContext) {
    ctx.add_line(&format!(
        "pub const INTERFACE_NAME: &'static str = {:?};",
        unit.interface.name
    ));
    ctx.add("\n");
    ctx.add_line(
        "pub fn new(bus: Connection, destination: impl Into<String>, path: impl Into<String>) -> Self {",
    );
    ctx.indent();
    ctx.add_line("Self {");
    ctx.indent();
    ctx.add_line("bus,");
    ctx.add_line("destination: destination.into(),");
    ctx.add_line("path: path.into(),");
    ctx.dedent();
    ctx.add_line("}");
    ctx.dedent();
    ctx.add_line("}");
}

/// Mapped, planned in-argument
struct Parameter {
    name: String,
    ty: HostType,
    write: WriteCall,
}

/// Mapped, planned out-argument or signal argument
struct Field {
    name: String,
    ty: HostType,
    read: ReadCall,
}

fn parameters(args: &[Arg], scope: &str, ctx: &CompilerContext) -> CompileResult<Vec<Parameter>> {
    let mut names = Names::new(scope);
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            let name = naming::argument_name(arg.name.as_deref(), index);
            names.claim(&name)?;
            let ty = map_type(&arg.type_)?;
            let write = plan_encode(&arg.type_, Access::owned(name.clone()))?;
            ctx.use_items(ty.imports());
            ctx.use_items(write.imports());
            Ok(Parameter { name, ty, write })
        })
        .collect()
}

fn fields(args: &[Arg], scope: &str, ctx: &CompilerContext) -> CompileResult<Vec<Field>> {
    let mut names = Names::new(scope);
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            let name = naming::parameter_name(arg.name.as_deref(), index);
            names.claim(&name)?;
            let ty = map_type(&arg.type_)?;
            let read = plan_decode(&arg.type_)?;
            ctx.use_items(ty.imports());
            if read.uses_value() {
                ctx.use_item("Value");
            }
            Ok(Field { name, ty, read })
        })
        .collect()
}

fn record_fields(fields: &[Field]) -> Vec<(String, HostType)> {
    fields
        .iter()
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect()
}

fn compile_method(
    method: &Method,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    let result = compile_method_body(method, unit, ctx);
    unit.in_member(&method.name, result)
}

fn compile_method_body(
    method: &Method,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    let function = naming::function_name(&method.name);
    unit.claim_member(&function)?;
    debug!(
        interface = %unit.interface.name,
        method = %method.name,
        inputs = method.in_args.len(),
        outputs = method.out_args.len(),
        "Compiling method"
    );

    let scope = format!("{}::{}", unit.type_name, function);
    let params = parameters(&method.in_args, &scope, ctx)?;
    let outs = fields(&method.out_args, &scope, ctx)?;
    for param in &params {
        unit.note_identifier(&param.name);
    }

    let return_type = match outs.as_slice() {
        [] => "()".to_string(),
        [single] => single.ty.render(),
        _ => unit.add_record(
            naming::result_record_name(&method.name),
            record_fields(&outs),
        )?,
    };

    ctx.use_item("RuntimeResult");
    if !params.is_empty() {
        ctx.use_item("MessageWriter");
    }
    if !outs.is_empty() {
        ctx.use_item("MessageReader");
    }

    let mut signature = vec!["&self".to_string()];
    signature.extend(
        params
            .iter()
            .map(|param| format!("{}: {}", param.name, param.ty.render())),
    );
    ctx.add_line(&format!(
        "pub async fn {}({}) -> RuntimeResult<{}> {{",
        function,
        signature.join(", "),
        return_type
    ));
    ctx.indent();

    let binding = if params.is_empty() { "let" } else { "let mut" };
    ctx.add_line(&format!(
        "{} method_call = self.bus.new_method_call(&self.destination, &self.path, Self::INTERFACE_NAME, {:?});",
        binding, method.name
    ));
    for param in &params {
        ctx.add_line(&format!("{}?;", param.write.render("method_call")));
    }

    let await_reply = "method_call.await_reply(&self.bus).await?;";
    match outs.as_slice() {
        [] => {
            ctx.add_line(await_reply);
            ctx.add_line("Ok(())");
        }
        [single] => {
            ctx.add_line(&format!("let mut reply = {}", await_reply));
            ctx.add_line(&single.read.render("reply"));
        }
        _ => {
            ctx.add_line(&format!("let mut reply = {}", await_reply));
            compile_record_literal(&return_type, &outs, "reply", ctx);
        }
    }

    ctx.dedent();
    ctx.add_line("}");
    Ok(())
}

/// `Ok(path::Record { field: <read>?, .. })`, fields read in order
fn compile_record_literal(path: &str, fields: &[Field], receiver: &str, ctx: &CompilerContext) {
    ctx.add_line(&format!("Ok({} {{", path));
    ctx.indent();
    for field in fields {
        ctx.add_line(&format!("{}: {}?,", field.name, field.read.render(receiver)));
    }
    ctx.dedent();
    ctx.add_line("})");
}

fn compile_signal(
    signal: &Signal,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    let result = compile_signal_body(signal, unit, ctx);
    unit.in_member(&signal.name, result)
}

fn compile_signal_body(
    signal: &Signal,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    let function = naming::function_name(&signal.name);
    unit.claim_member(&function)?;
    debug!(
        interface = %unit.interface.name,
        signal = %signal.name,
        args = signal.args.len(),
        "Compiling signal"
    );

    let scope = format!("{}::{}", unit.type_name, function);
    let args = fields(&signal.args, &scope, ctx)?;
    let event = if args.is_empty() {
        None
    } else {
        Some(unit.add_record(naming::event_record_name(&signal.name), record_fields(&args))?)
    };

    ctx.use_items(["RuntimeResult", "Stream", "StreamExt"]);
    let item = match &event {
        Some(path) => format!("RuntimeResult<{}>", path),
        None => "()".to_string(),
    };
    ctx.add_line(&format!(
        "pub fn {}(&self) -> RuntimeResult<impl Stream<Item = {}>> {{",
        function, item
    ));
    ctx.indent();
    ctx.add_line(&format!(
        "let stream = self.bus.subscribe(Self::INTERFACE_NAME, {:?}, Some(self.path.as_str()), Some(self.destination.as_str()))?;",
        signal.name
    ));

    match &event {
        None => ctx.add_line("Ok(stream.map(|_signal| ()))"),
        Some(path) => {
            ctx.use_item("MessageReader");
            ctx.add_line(&format!(
                "Ok(stream.map(|mut signal| -> RuntimeResult<{}> {{",
                path
            ));
            ctx.indent();
            compile_record_literal(path, &args, "signal", ctx);
            ctx.dedent();
            ctx.add_line("}))");
        }
    }

    ctx.dedent();
    ctx.add_line("}");
    Ok(())
}

fn compile_property(
    property: &Property,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    let result = compile_property_body(property, unit, ctx);
    unit.in_member(&property.name, result)
}

fn compile_property_body(
    property: &Property,
    unit: &mut InterfaceUnit,
    ctx: &CompilerContext,
) -> CompileResult<()> {
    debug!(
        interface = %unit.interface.name,
        property = %property.name,
        access = ?property.access,
        "Compiling property"
    );

    let ty = map_type(&property.type_)?;
    let rendered = ty.render();
    ctx.use_items(ty.imports());

    if property.access.is_readable() {
        let getter = naming::getter_name(&property.name);
        unit.claim_member(&getter)?;
        ctx.use_item("RuntimeResult");
        ctx.add("\n");
        ctx.add_line(&format!(
            "pub async fn {}(&self) -> RuntimeResult<{}> {{",
            getter, rendered
        ));
        ctx.indent();
        ctx.add_line(&format!(
            "self.bus.get_property::<{}>(&self.destination, &self.path, Self::INTERFACE_NAME, {:?}).await",
            rendered, property.name
        ));
        ctx.dedent();
        ctx.add_line("}");
    }

    if property.access.is_writable() {
        let setter = naming::setter_name(&property.name);
        unit.claim_member(&setter)?;
        ctx.use_items(["RuntimeResult", "Value"]);
        ctx.add("\n");
        ctx.add_line(&format!(
            "pub async fn {}(&self, value: {}) -> RuntimeResult<()> {{",
            setter, rendered
        ));
        ctx.indent();
        ctx.add_line(&format!(
            "self.bus.set_property(&self.destination, &self.path, Self::INTERFACE_NAME, {:?}, {:?}, {}).await",
            property.name,
            property.type_.to_signature(),
            wrap_value(&property.type_, &ty, "value")
        ));
        ctx.dedent();
        ctx.add_line("}");
    }

    Ok(())
}

fn compile_records(unit: &InterfaceUnit, ctx: &CompilerContext) {
    if unit.records.is_empty() {
        return;
    }

    let mut imports: Vec<&'static str> = unit
        .records
        .iter()
        .flat_map(|record| record.fields.iter())
        .flat_map(|(_, ty)| ty.imports())
        .collect();
    imports.sort_unstable();
    imports.dedup();

    ctx.add("\n");
    ctx.add_line(&format!("pub mod {} {{", unit.module));
    ctx.indent();
    if !imports.is_empty() {
        ctx.add_line(&format!("use super::{{{}}};", imports.join(", ")));
    }

    for (index, record) in unit.records.iter().enumerate() {
        if index > 0 || !imports.is_empty() {
            ctx.add("\n");
        }
        if record.fields.iter().any(|(name, _)| name.chars().any(char::is_uppercase)) {
            ctx.add_line("#[allow(non_snake_case)]");
        }
        ctx.add_line("#[derive(Debug, Clone, PartialEq)]");
        ctx.add_line(&format!("pub struct {} {{", record.name));
        ctx.indent();
        for (name, ty) in &record.fields {
            ctx.add_line(&format!("pub {}: {},", name, ty.render()));
        }
        ctx.dedent();
        ctx.add_line("}");
    }

    ctx.dedent();
    ctx.add_line("}");
}
