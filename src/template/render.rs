use std::collections::HashMap;
use std::sync::LazyLock;

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::config::types::PromptTemplate;
use crate::error::BotError;

/// Shared minijinja environment with strict undefined behavior.
static JINJA_ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
});

/// Rendered prompt pair ready for the AI model.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Render a prompt template pair with the given variables.
///
/// Takes ownership of `vars` to avoid cloning large Values (file content
/// and patches can be 100 KB+). The context Value is built once from the
/// owned map and shared across both template renders via cheap Arc clone.
pub fn render_prompt(
    template: &PromptTemplate,
    vars: HashMap<String, Value>,
) -> Result<RenderedPrompt, BotError> {
    let env = &*JINJA_ENV;

    let ctx = Value::from_iter(vars);

    let system = render_template(env, "system", &template.system, &ctx)?;
    let user = render_template(env, "user", &template.user, &ctx)?;

    Ok(RenderedPrompt { system, user })
}

/// Render a single template string with a pre-built context.
fn render_template(
    env: &Environment,
    name: &str,
    template_str: &str,
    ctx: &Value,
) -> Result<String, BotError> {
    let tmpl = env
        .template_from_str(template_str)
        .map_err(|e| BotError::Other(format!("failed to parse {name} template: {e}")))?;

    tmpl.render(ctx.clone())
        .map_err(|e| BotError::Other(format!("failed to render {name} template: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_variables() {
        let template = PromptTemplate {
            system: "Review PR titled '{{ title }}'.".into(),
            user: "Diff:\n{{ patch }}".into(),
        };

        let mut vars = HashMap::new();
        vars.insert("title".into(), Value::from("Fix login bug"));
        vars.insert("patch".into(), Value::from("+new line\n-old line"));

        let result = render_prompt(&template, vars).unwrap();
        assert!(result.system.contains("Fix login bug"));
        assert!(result.user.contains("+new line"));
    }

    #[test]
    fn test_render_conditionals() {
        let template = PromptTemplate {
            system: "{%- if extra_instructions %}Extra: {{ extra_instructions }}{% endif %}".into(),
            user: "Hello".into(),
        };

        let mut vars = HashMap::new();
        vars.insert(
            "extra_instructions".into(),
            Value::from("Focus on security"),
        );
        let result = render_prompt(&template, vars.clone()).unwrap();
        assert!(result.system.contains("Focus on security"));

        // Empty string is falsy
        vars.insert("extra_instructions".into(), Value::from(""));
        let result = render_prompt(&template, vars).unwrap();
        assert!(!result.system.contains("Extra:"));
    }

    #[test]
    fn test_render_strict_undefined_fails() {
        let template = PromptTemplate {
            system: "{{ undefined_var }}".into(),
            user: "".into(),
        };

        let result = render_prompt(&template, HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_template_injection_safe() {
        // Jinja syntax inside variable values must NOT be evaluated.
        let template = PromptTemplate {
            system: "Title: {{ title }}".into(),
            user: "Body: {{ description }}".into(),
        };

        let mut vars = HashMap::new();
        vars.insert(
            "title".into(),
            Value::from("{{ github.user_token }} {% for i in range(999) %}x{% endfor %}"),
        );
        vars.insert(
            "description".into(),
            Value::from("{{ anthropic.key }}"),
        );

        let result = render_prompt(&template, vars).unwrap();
        assert!(result.system.contains("{{ github.user_token }}"));
        assert!(result.system.contains("{% for i in range(999) %}"));
        assert!(result.user.contains("{{ anthropic.key }}"));
    }

    #[test]
    fn test_render_real_prompt_template() {
        // Load actual settings and render pr_review_prompt with test variables
        let settings = crate::config::loader::load_settings(&HashMap::new()).unwrap();

        let mut vars = HashMap::new();
        vars.insert("title".into(), Value::from("Add authentication"));
        vars.insert("description".into(), Value::from("Adds OAuth2 support"));
        vars.insert("author".into(), Value::from("octocat"));
        vars.insert("filename".into(), Value::from("src/auth.rs"));
        vars.insert("content".into(), Value::from("fn login() {}"));
        vars.insert("patch".into(), Value::from("+fn login() {}"));
        vars.insert("extra_instructions".into(), Value::from(""));

        let result = render_prompt(&settings.pr_review_prompt, vars).unwrap();

        assert!(result.system.contains("senior software engineer"));
        assert!(result.user.contains("src/auth.rs"));
        assert!(result.user.contains("+fn login() {}"));
    }
}
