//! Server-side templates, compiled into the binary.

use axum::response::Html;
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::LeafError;
use crate::types::{Biome, PlantType, User};
use crate::validation::FieldError;

const TEMPLATES: [(&str, &str); 12] = [
    ("layout.html", include_str!("../../templates/layout.html")),
    ("errors.html", include_str!("../../templates/errors.html")),
    ("plant_form.html", include_str!("../../templates/plant_form.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("signup.html", include_str!("../../templates/signup.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("garden.html", include_str!("../../templates/garden.html")),
    ("plant.html", include_str!("../../templates/plant.html")),
    ("collections.html", include_str!("../../templates/collections.html")),
    ("collection.html", include_str!("../../templates/collection.html")),
    ("admin.html", include_str!("../../templates/admin.html")),
    ("profile.html", include_str!("../../templates/profile.html")),
];

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, LeafError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, page: &Page) -> Result<Html<String>, LeafError> {
        Ok(Html(self.tera.render(name, &page.context)?))
    }
}

/// Template context with the values every page needs.
pub struct Page {
    context: Context,
}

impl Page {
    pub fn new(title: &str, current_user: Option<&User>) -> Self {
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("current_user", &current_user);
        context.insert("errors", &Vec::<FieldError>::new());
        context.insert("plant_types", &PlantType::ALL.map(|t| t.as_str()));
        context.insert("biomes", &Biome::ALL.map(|b| b.as_str()));
        Self { context }
    }

    pub fn with(mut self, key: &str, value: &impl Serialize) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn with_errors(self, errors: &[FieldError]) -> Self {
        self.with("errors", &errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::PlantForm;

    #[test]
    fn every_template_compiles() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn garden_lists_errors_and_escapes_input() {
        let views = Views::new().unwrap();
        let form = PlantForm {
            common_name: "<script>".into(),
            ..PlantForm::default()
        };
        let page = Page::new("Garden", None)
            .with("plants", &Vec::<crate::types::Plant>::new())
            .with("form", &form)
            .with_errors(&[FieldError::new("type", "\"type\" must be one of the known plant types")]);
        let html = views.render("garden.html", &page).unwrap().0;
        assert!(html.contains("must be one of the known plant types"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("No plants recorded yet."));
    }
}
