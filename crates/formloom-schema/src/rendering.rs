//! The template host: the boundary to the templating substrate.
//!
//! Directive text from the expander is rendered by handlebars with three
//! registered helpers: `iterate` re-renders its body once per integer value
//! with the named loop variable merged into the binding data, and
//! `any_tags_selected` / `no_tags_selected` test the node's tags against the
//! `tags` array in the bindings. Strict mode is off so a loop variable
//! referenced outside its loop substitutes as empty instead of failing, and
//! escaping is off because the rendered text is tabular, not HTML.

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, Renderable,
};
use serde_json::Value;
use tracing::debug;

/// Named variable bindings handed to a render call.
pub type Bindings = serde_json::Map<String, Value>;

/// Render failure. Undefined variables are not errors; only malformed
/// directive text is.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

/// The template host.
pub struct TemplateHost {
    handlebars: Handlebars<'static>,
}

impl TemplateHost {
    /// Create a host with the expansion helpers registered.
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("iterate", Box::new(IterateHelper));
        handlebars.register_helper("any_tags_selected", Box::new(AnyTagsSelectedHelper));
        handlebars.register_helper("no_tags_selected", Box::new(NoTagsSelectedHelper));

        Self { handlebars }
    }

    /// Render directive text against a binding set.
    pub fn render(&self, template: &str, bindings: &Bindings) -> Result<String, RenderError> {
        debug!(bindings = bindings.len(), "rendering directive text");
        Ok(self.handlebars.render_template(template, bindings)?)
    }
}

impl Default for TemplateHost {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Helper Functions =====

/// `{{#iterate "var" 1 2 3}}` renders its body once per value with `var`
/// bound, layered over the enclosing binding data so nested loops see the
/// variables of the loops around them.
#[derive(Clone, Copy)]
struct IterateHelper;

impl HelperDef for IterateHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let variable = h
            .param(0)
            .and_then(|v| v.value().as_str())
            .unwrap_or("i_iter")
            .to_string();

        let values: Vec<i64> = h
            .params()
            .iter()
            .skip(1)
            .filter_map(|p| p.value().as_i64())
            .collect();

        let Some(template) = h.template() else {
            return Ok(());
        };

        // Merge the loop variable over the enclosing binding data: start from
        // the innermost block's value if one is active (so nested loops see the
        // variables of the loops around them), otherwise the root context data.
        let mut data = rc
            .block()
            .and_then(|b| b.base_value())
            .cloned()
            .unwrap_or_else(|| ctx.data().clone());
        if !data.is_object() {
            data = serde_json::json!({});
        }

        for value in values {
            data[variable.as_str()] = Value::from(value);
            let mut block = handlebars::BlockContext::new();
            block.set_base_value(data.clone());
            rc.push_block(block);
            template.render(r, ctx, rc, out)?;
            rc.pop_block();
        }

        Ok(())
    }
}

#[derive(Clone, Copy)]
struct AnyTagsSelectedHelper;

impl HelperDef for AnyTagsSelectedHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        render_on_membership(h, r, ctx, rc, out, true)
    }
}

#[derive(Clone, Copy)]
struct NoTagsSelectedHelper;

impl HelperDef for NoTagsSelectedHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        render_on_membership(h, r, ctx, rc, out, false)
    }
}

/// Render the block body when "any param tag is in the `tags` binding"
/// matches `wanted`, the inverse block otherwise.
fn render_on_membership<'reg: 'rc, 'rc>(
    h: &Helper<'rc>,
    r: &'reg Handlebars<'reg>,
    ctx: &'rc Context,
    rc: &mut RenderContext<'reg, 'rc>,
    out: &mut dyn Output,
    wanted: bool,
) -> HelperResult {
    let selected = selected_tags(ctx);
    let hit = h
        .params()
        .iter()
        .filter_map(|p| p.value().as_str())
        .any(|tag| selected.iter().any(|s| s == tag));

    let template = if hit == wanted {
        h.template()
    } else {
        h.inverse()
    };

    if let Some(t) = template {
        t.render(r, ctx, rc, out)?;
    }

    Ok(())
}

fn selected_tags(ctx: &Context) -> Vec<String> {
    ctx.data()
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
