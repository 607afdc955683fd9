use minijinja::{context, Environment};

use super::models::Book;

const LISTING_TEMPLATE: &str = "index.html";

/// Server-rendered listing page.
pub struct ListingView {
    env: Environment<'static>,
}

impl ListingView {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(
            LISTING_TEMPLATE,
            include_str!("../../../templates/index.html"),
        )?;
        Ok(Self { env })
    }

    pub fn render(&self, books: &[Book]) -> Result<String, minijinja::Error> {
        self.env
            .get_template(LISTING_TEMPLATE)?
            .render(context! { books => books })
    }
}
