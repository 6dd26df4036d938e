use std::fmt;
use std::str::FromStr;

/// Separator between the segments of a composite node id.
pub const PATH_SEPARATOR: &str = "::";

/// Typed view of a composite node id: `<connectionId>::<segment>::<segment>...`.
///
/// Every node synthesized below a connection carries an id of this shape, so
/// the owning connection and the backend path can be recovered from the id
/// alone. Folder and connection ids are single-segment paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    connection_id: String,
    segments: Vec<String>,
}

impl NodePath {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            segments: Vec::new(),
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Segments after the connection id; empty for the connection itself.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn trailing_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn is_connection_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the path of a direct child with the given segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            connection_id: self.connection_id.clone(),
            segments,
        }
    }
}

/// Id of the direct child `segment` of the node `parent_id`.
pub fn child_id(parent_id: &str, segment: &str) -> String {
    format!("{}{}{}", parent_id, PATH_SEPARATOR, segment)
}

/// The owning connection of a composite id: its first segment.
pub fn connection_id_of(id: &str) -> &str {
    id.split(PATH_SEPARATOR).next().unwrap_or(id)
}

/// True when `id` lies strictly below `ancestor_id` in the composite id space.
pub fn is_descendant_id(ancestor_id: &str, id: &str) -> bool {
    id.len() > ancestor_id.len() + PATH_SEPARATOR.len()
        && id.starts_with(ancestor_id)
        && id[ancestor_id.len()..].starts_with(PATH_SEPARATOR)
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connection_id)?;
        for segment in &self.segments {
            write!(f, "{}{}", PATH_SEPARATOR, segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePathParseError(pub String);

impl fmt::Display for NodePathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid node path: {:?}", self.0)
    }
}

impl std::error::Error for NodePathParseError {}

impl FromStr for NodePath {
    type Err = NodePathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(PATH_SEPARATOR);

        let connection_id = match parts.next() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(NodePathParseError(s.to_string())),
        };

        let segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(NodePathParseError(s.to_string()));
        }

        Ok(Self {
            connection_id,
            segments,
        })
    }
}
