use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::{handlebars_helper, RenderError};
use serde::Serialize;

#[derive(Clone)]
pub struct Template {
    r: Arc<handlebars::Handlebars<'static>>,
}

impl Template {
    /// Registers every `*.hbs` file of `dir` under its file name.
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut handlebars = handlebars::Handlebars::new();
        for entity in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let entity = entity?;
            let path = entity.path();
            if path.extension().map_or(true, |ext| ext != "hbs") {
                continue;
            }

            let name = entity.file_name().to_string_lossy().into_owned();
            log::debug!("registering template {name}");
            handlebars
                .register_template_file(&name, &path)
                .with_context(|| format!("registering template {}", path.display()))?;
        }

        handlebars_helper!(nor_amt: |i: f64| format!("{:.02}", i));
        handlebars.register_helper("nor_amt", Box::new(nor_amt));

        Ok(Self {
            r: Arc::new(handlebars),
        })
    }

    pub fn render_with_status<T>(
        &self,
        status: StatusCode,
        name: &str,
        data: &T,
    ) -> Result<Response, RenderError>
    where
        T: Serialize,
    {
        log::trace!("render '{}'", name);
        let html = self.r.render(name, data)?;
        Ok((status, Html(html)).into_response())
    }

    /// Like [`Template::render_with_status`], falling back to a plain-text 500 when the
    /// template itself fails.
    pub fn render_or_500<T>(&self, status: StatusCode, name: &str, data: &T) -> Response
    where
        T: Serialize,
    {
        match self.render_with_status(status, name, data) {
            Ok(res) => res,
            Err(err) => {
                log::error!("cannot render '{name}': {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template. Error: {err}"),
                )
                    .into_response()
            }
        }
    }
}
