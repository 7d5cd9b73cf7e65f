//! Run-level options recognised by the proxy and how they map onto Bolt flags.

use crate::cli::REDACTED;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// The one boolean option Bolt has no `--no-` form for.
pub const NO_NEGATION_OPTION: &str = "noop";

/// Prefix used internally for options whose Bolt flag lacks it (`winrm-ssl` -> `--ssl`).
pub const FLAG_NAMESPACE_PREFIX: &str = "winrm-";

pub const LOG_LEVEL_OPTION: &str = "log-level";

pub const TRANSPORTS: &[&str] = &["ssh", "winrm"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionType {
    Boolean,
    String,
    OneOf(Vec<&'static str>),
}

impl Serialize for OptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionType::Boolean => serializer.serialize_str("boolean"),
            OptionType::String => serializer.serialize_str("string"),
            OptionType::OneOf(values) => values.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionDescriptor {
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<OptionValue>,
    pub sensitive: bool,
    /// Transports the option applies to, so a UI can hide irrelevant ones.
    pub transport: Vec<&'static str>,
    pub description: &'static str,
}

/// A validated option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Bool(b) => serializer.serialize_bool(*b),
            OptionValue::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

pub type OptionSchema = BTreeMap<&'static str, OptionDescriptor>;

fn descriptor(
    option_type: OptionType,
    transport: &[&'static str],
    sensitive: bool,
    description: &'static str,
) -> OptionDescriptor {
    OptionDescriptor {
        option_type,
        default: None,
        sensitive,
        transport: transport.to_vec(),
        description,
    }
}

static SCHEMA: LazyLock<OptionSchema> = LazyLock::new(|| {
    let both: &[&'static str] = &["ssh", "winrm"];
    let ssh: &[&'static str] = &["ssh"];
    let winrm: &[&'static str] = &["winrm"];

    let mut schema = OptionSchema::new();
    schema.insert(
        "transport",
        OptionDescriptor {
            default: Some(OptionValue::Str("ssh".into())),
            ..descriptor(
                OptionType::OneOf(TRANSPORTS.to_vec()),
                both,
                false,
                "The transport method to use for connecting to target hosts.",
            )
        },
    );
    schema.insert(
        LOG_LEVEL_OPTION,
        descriptor(
            OptionType::OneOf(vec!["error", "warning", "info", "debug", "trace"]),
            both,
            false,
            "Set the log level during Bolt execution.",
        ),
    );
    schema.insert(
        "verbose",
        descriptor(
            OptionType::Boolean,
            both,
            false,
            "Print additional information during Bolt execution, including out::verbose statements.",
        ),
    );
    schema.insert(
        NO_NEGATION_OPTION,
        descriptor(OptionType::Boolean, both, false, "Make no changes to the target hosts."),
    );
    schema.insert(
        "tmpdir",
        descriptor(
            OptionType::String,
            both,
            false,
            "Directory to use for temporary files on target hosts.",
        ),
    );
    schema.insert(
        "user",
        descriptor(OptionType::String, both, false, "Username used for SSH or WinRM authentication."),
    );
    schema.insert(
        "password",
        descriptor(OptionType::String, both, true, "Password used for SSH or WinRM authentication."),
    );
    schema.insert(
        "host-key-check",
        descriptor(
            OptionType::Boolean,
            ssh,
            false,
            "Whether to perform host key verification when connecting over SSH.",
        ),
    );
    schema.insert(
        "private-key",
        descriptor(
            OptionType::String,
            ssh,
            false,
            "Path on the proxy host to the private key used for SSH authentication.",
        ),
    );
    schema.insert(
        "run-as",
        descriptor(
            OptionType::String,
            ssh,
            false,
            "The user to run commands as on the target host.",
        ),
    );
    schema.insert(
        "sudo-password",
        descriptor(
            OptionType::String,
            ssh,
            true,
            "Password used for privilege escalation when using SSH.",
        ),
    );
    schema.insert(
        "winrm-ssl",
        descriptor(OptionType::Boolean, winrm, false, "Use SSL when connecting to hosts via WinRM."),
    );
    schema.insert(
        "winrm-ssl-verify",
        descriptor(
            OptionType::Boolean,
            winrm,
            false,
            "Verify the remote host SSL certificate when connecting via WinRM.",
        ),
    );
    schema
});

/// Every recognised option, sorted by name.
pub fn option_schema() -> &'static OptionSchema {
    &SCHEMA
}

pub fn is_sensitive(name: &str) -> bool {
    SCHEMA.get(name).is_some_and(|d| d.sensitive)
}

/// Render options for log output with sensitive values masked.
pub fn scrub(options: &BTreeMap<String, OptionValue>) -> String {
    let rendered: Vec<String> = options
        .iter()
        .map(|(key, value)| {
            if is_sensitive(key) {
                format!("{}={}", key, REDACTED)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect();
    format!("{{{}}}", rendered.join(", "))
}
