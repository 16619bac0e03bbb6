//! Template engine for rendering site markup.
//!
//! Templates use EJS-style delimiters on top of minijinja:
//!
//! - `<%= expr %>` prints an HTML-escaped value
//! - `<% for item in list %>...<% endfor %>` and `<% if cond %>...<% endif %>`
//! - `<%# comment %>`
//!
//! Only escaped output exists. EJS's raw `<%- expr %>` is not supported: the
//! `-` reads as whitespace control on a block tag, so such markup fails to
//! render with a syntax error.

use minijinja::syntax::SyntaxConfig;
use minijinja::{context, AutoEscape, Environment};

use crate::error::SiteError;
use crate::record::SiteRecord;

/// Name under which slot markup is compiled (shows up in error messages).
const MARKUP_TEMPLATE_NAME: &str = "index.ejs";

/// Template engine using minijinja with EJS delimiters.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine.
    pub fn new() -> Result<Self, SiteError> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters("<%", "%>")
            .variable_delimiters("<%=", "%>")
            .comment_delimiters("<%#", "%>")
            .build()?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        Ok(Self { env })
    }

    /// Render slot markup against a content record.
    ///
    /// Every field is always present in the context; unset fields are empty
    /// strings or empty lists.
    pub fn render_site(&self, markup: &str, record: &SiteRecord) -> Result<String, SiteError> {
        let contact = context! {
            phone => record.contact.phone.as_deref().unwrap_or_default(),
            email => record.contact.email.as_deref().unwrap_or_default(),
        };

        let html = self.env.render_named_str(
            MARKUP_TEMPLATE_NAME,
            markup,
            context! {
                name => &record.name,
                siteType => &record.site_type,
                about => &record.about,
                description => &record.description,
                services => &record.services,
                contact => contact,
                address => &record.address,
                website => &record.website,
                socialAccounts => &record.social_accounts,
                images => &record.images,
            },
        )?;

        Ok(html)
    }
}

/// Markup of the starter template written by `sitewright init`.
pub const STARTER_MARKUP: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title><%= name %></title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <header class="hero">
    <h1><%= name %></h1>
    <% if siteType %><p class="tag"><%= siteType %></p><% endif %>
  </header>
  <main>
    <% if about %>
    <section class="about">
      <h2>About</h2>
      <p><%= about %></p>
    </section>
    <% endif %>
    <% if description %>
    <section class="description">
      <p><%= description %></p>
    </section>
    <% endif %>
    <% if services %>
    <section class="services">
      <h2>Services</h2>
      <ul>
      <% for service in services %>
        <li><%= service %></li>
      <% endfor %>
      </ul>
    </section>
    <% endif %>
    <% if images %>
    <section class="gallery">
      <% for image in images %>
      <img src="<%= image %>" alt="<%= name %>">
      <% endfor %>
    </section>
    <% endif %>
  </main>
  <footer>
    <% if contact.phone %><p>Phone: <%= contact.phone %></p><% endif %>
    <% if contact.email %><p>Email: <a href="mailto:<%= contact.email %>"><%= contact.email %></a></p><% endif %>
    <% if address %><p><%= address %></p><% endif %>
    <% if website %><p><a href="<%= website %>"><%= website %></a></p><% endif %>
    <% if socialAccounts %>
    <ul class="social">
      <% for account in socialAccounts %>
      <li><a href="<%= account.url %>"><%= account.type %></a></li>
      <% endfor %>
    </ul>
    <% endif %>
  </footer>
</body>
</html>
"##;

/// Stylesheet of the starter template written by `sitewright init`.
pub const STARTER_STYLESHEET: &str = r#"* {
  box-sizing: border-box;
  margin: 0;
  padding: 0;
}

body {
  font-family: system-ui, -apple-system, sans-serif;
  line-height: 1.6;
  color: #1f2933;
  background: #f8fafc;
}

.hero {
  padding: 4rem 1.5rem;
  text-align: center;
  background: #1f2933;
  color: #f8fafc;
}

.tag {
  text-transform: uppercase;
  letter-spacing: 0.1em;
  opacity: 0.7;
}

main {
  max-width: 800px;
  margin: 0 auto;
  padding: 2rem 1.5rem;
}

section + section {
  margin-top: 2rem;
}

.gallery {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(200px, 1fr));
  gap: 1rem;
}

.gallery img {
  width: 100%;
  border-radius: 0.5rem;
}

footer {
  padding: 2rem 1.5rem;
  text-align: center;
  border-top: 1px solid #e4e7eb;
}

.social {
  list-style: none;
  display: flex;
  justify-content: center;
  gap: 1rem;
}
"#;
