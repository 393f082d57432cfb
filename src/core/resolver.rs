//! Versioned module resolver
//!
//! Maps an API version identifier to the command modules and the client
//! constructor implementing it. Adding an API version means adding one entry
//! to [`API_VERSIONS`]; the dispatcher never names a version itself.

use miette::Diagnostic;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::cli::registry::CommandSource;
use crate::client::ClientFactory;
use crate::v1;

/// The per-version components that can be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Client,
    Shell,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Client => "client",
            Component::Shell => "shell",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Component::Client),
            "shell" => Ok(Component::Shell),
            other => Err(ResolveError::UnknownComponent {
                kind: other.to_string(),
            }),
        }
    }
}

/// Errors from version lookup
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("No {kind} implementation for API version '{version}'")]
    #[diagnostic(
        code(rallyclient::version::not_found),
        help("Supported API versions: {supported}")
    )]
    VersionNotFound {
        version: String,
        kind: Component,
        supported: String,
    },

    #[error("Unknown component '{kind}' (expected 'client' or 'shell')")]
    #[diagnostic(code(rallyclient::version::component))]
    UnknownComponent { kind: String },
}

/// The command modules making up one version's shell
pub struct ShellModule {
    pub version: &'static str,
    pub command_modules: &'static [&'static (dyn CommandSource + Sync)],
}

/// What [`resolve`] hands back for a component
pub enum ModuleHandle {
    Shell(&'static ShellModule),
    Client(ClientFactory),
}

struct ApiVersion {
    id: &'static str,
    shell: ShellModule,
    client: ClientFactory,
}

static API_VERSIONS: &[ApiVersion] = &[ApiVersion {
    id: "1",
    shell: ShellModule {
        version: "1",
        command_modules: v1::COMMAND_MODULES,
    },
    client: v1::connect,
}];

/// API versions with a registered implementation
pub fn supported_versions() -> Vec<&'static str> {
    API_VERSIONS.iter().map(|v| v.id).collect()
}

/// Locate the implementation of `kind` (`"client"` or `"shell"`) for `version`
pub fn resolve(version: &str, kind: &str) -> Result<ModuleHandle, ResolveError> {
    let component: Component = kind.parse()?;
    let entry = API_VERSIONS
        .iter()
        .find(|v| v.id == version)
        .ok_or_else(|| ResolveError::VersionNotFound {
            version: version.to_string(),
            kind: component,
            supported: supported_versions().join(", "),
        })?;

    Ok(match component {
        Component::Client => ModuleHandle::Client(entry.client),
        Component::Shell => ModuleHandle::Shell(&entry.shell),
    })
}

/// Typed shortcut for the shell component
pub fn shell_module(version: &str) -> Result<&'static ShellModule, ResolveError> {
    match resolve(version, Component::Shell.as_str())? {
        ModuleHandle::Shell(module) => Ok(module),
        ModuleHandle::Client(_) => Err(ResolveError::UnknownComponent {
            kind: Component::Client.to_string(),
        }),
    }
}

/// Typed shortcut for the client component
pub fn client_factory(version: &str) -> Result<ClientFactory, ResolveError> {
    match resolve(version, Component::Client.as_str())? {
        ModuleHandle::Client(factory) => Ok(factory),
        ModuleHandle::Shell(_) => Err(ResolveError::UnknownComponent {
            kind: Component::Shell.to_string(),
        }),
    }
}
