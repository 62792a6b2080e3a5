use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Options for stub compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Path the emitted `use` lines import the runtime from
    pub runtime_crate: String,
    /// Whether to start the unit with the generated-file banner
    pub emit_header: bool,
    /// Document name mentioned in the banner
    pub source_name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            runtime_crate: "busgen_runtime".to_string(),
            emit_header: true,
            source_name: None,
        }
    }
}

impl CompileOptions {
    /// Output without the banner, useful when embedding stubs
    pub fn bare() -> Self {
        Self {
            emit_header: false,
            ..Default::default()
        }
    }

    pub fn with_runtime_crate(mut self, path: impl Into<String>) -> Self {
        self.runtime_crate = path.into();
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

/// Compilation context for managing state during code generation
pub struct CompilerContext {
    buffer: Rc<RefCell<String>>,
    indent_level: Rc<RefCell<usize>>,
    imports: Rc<RefCell<BTreeSet<&'static str>>>,
    pub options: CompileOptions,
}

impl CompilerContext {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(String::new())),
            indent_level: Rc::new(RefCell::new(0)),
            imports: Rc::new(RefCell::new(BTreeSet::new())),
            options,
        }
    }

    pub fn add(&self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }

    pub fn add_line(&self, text: &str) {
        self.add_indented(text);
        self.add("\n");
    }

    pub fn add_indented(&self, text: &str) {
        let indent = "    ".repeat(*self.indent_level.borrow());
        self.buffer.borrow_mut().push_str(&indent);
        self.buffer.borrow_mut().push_str(text);
    }

    pub fn indent(&self) {
        *self.indent_level.borrow_mut() += 1;
    }

    pub fn dedent(&self) {
        let mut level = self.indent_level.borrow_mut();
        if *level > 0 {
            *level -= 1;
        }
    }

    /// Record a runtime item the emitted code refers to
    pub fn use_item(&self, item: &'static str) {
        self.imports.borrow_mut().insert(item);
    }

    pub fn use_items(&self, items: impl IntoIterator<Item = &'static str>) {
        self.imports.borrow_mut().extend(items);
    }

    /// Runtime items used so far, sorted
    pub fn imports(&self) -> Vec<&'static str> {
        self.imports.borrow().iter().copied().collect()
    }

    pub fn get_output(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Fresh output buffer sharing indentation and imports
    pub fn with_new_buffer(&self) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(String::new())),
            indent_level: self.indent_level.clone(),
            imports: self.imports.clone(),
            options: self.options.clone(),
        }
    }

    pub fn merge_buffer(&self, other: &CompilerContext) {
        self.buffer.borrow_mut().push_str(&other.buffer.borrow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indentation() {
        let ctx = CompilerContext::new(CompileOptions::default());
        ctx.add_line("impl X {");
        ctx.indent();
        ctx.add_line("fn a() {}");
        ctx.dedent();
        ctx.dedent();
        ctx.add_line("}");
        assert_eq!(ctx.get_output(), "impl X {\n    fn a() {}\n}\n");
    }

    #[test]
    fn test_child_buffer_shares_imports() {
        let ctx = CompilerContext::new(CompileOptions::default());
        let child = ctx.with_new_buffer();
        child.use_item("Value");
        child.use_item("Connection");
        child.use_item("Value");
        child.add("body");
        ctx.add("head ");
        ctx.merge_buffer(&child);

        assert_eq!(ctx.imports(), vec!["Connection", "Value"]);
        assert_eq!(ctx.get_output(), "head body");
    }
}
