//! Session-wide data attached to the game mode.

use serde_json::Value;
use tracing::warn;

use crate::content::{self, ContentKind};
use crate::error::SessionError;
use crate::node::{fetch, BuildContext, NodeCore};
use crate::spec::{self, ResourceSpec};

/// A named blob of data shared by every stage and state. Structured
/// sources merge their `data` field; markup and plain text land as a
/// string value.
#[derive(Debug)]
pub struct Resource {
    core: NodeCore,
    data: Value,
}

impl Resource {
    pub async fn load(spec: ResourceSpec, ctx: &BuildContext<'_>) -> Result<Self, SessionError> {
        Self::load_at(spec, ctx, String::new()).await
    }

    pub(crate) async fn load_at(
        spec: ResourceSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<Self, SessionError> {
        let mut resource = Self {
            core: NodeCore::untitled("Resource"),
            data: Value::Null,
        };
        resource.apply(spec, ctx, base).await?;
        resource.core.emit_load();
        Ok(resource)
    }

    async fn apply(
        &mut self,
        spec: ResourceSpec,
        ctx: &BuildContext<'_>,
        base: String,
    ) -> Result<(), SessionError> {
        if let Some(name) = spec.name {
            self.core.set_name(name);
        }
        if let Some(data) = spec.data {
            self.data = data;
        }

        if let Some(src) = spec.src.filter(|s| !s.is_empty()) {
            if self.core.source().is_none() {
                let locator = content::join(&base, &src);
                let loaded = fetch(ctx, &locator).await?;
                self.core.set_source(&locator);
                match loaded.kind {
                    ContentKind::Script => return Err(SessionError::Script(locator)),
                    ContentKind::Structured => {
                        let doc: ResourceSpec =
                            spec::parse_document("Resource", &locator, &loaded.content)?;
                        if let Some(name) = doc.name {
                            self.core.set_name(name);
                        }
                        if let Some(data) = doc.data {
                            self.data = data;
                        } else {
                            warn!(
                                "resource document '{locator}' carries no data field; keeping previous data"
                            );
                        }
                    }
                    _ => self.data = Value::String(loaded.content),
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }
}
