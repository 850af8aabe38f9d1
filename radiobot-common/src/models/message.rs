//! Platform-neutral outgoing messages. The Discord runtime renders these
//! into twilight embeds; tests inspect them directly.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub thumbnail_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: bool,
}

impl EmbedSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn with_timestamp(mut self) -> Self {
        self.timestamp = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub embed: Option<EmbedSpec>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn embed(embed: EmbedSpec) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }

    /// Plain text, else the embed's title, description or first field value.
    /// Used for logs and tests.
    pub fn summary(&self) -> String {
        if let Some(c) = &self.content {
            return c.clone();
        }
        self.embed
            .as_ref()
            .and_then(|e| {
                e.title
                    .clone()
                    .or_else(|| e.description.clone())
                    .or_else(|| e.fields.first().map(|f| f.value.clone()))
            })
            .unwrap_or_default()
    }
}
