//! # Identifier Subcommand
//!
//! ```bash
//! vcl id parse NcYxiDXkpYi6ov5FcYDi1e:3:CL:7:default
//! vcl id format cred-def --did NcYxiDXkpYi6ov5FcYDi1e --schema-seq-no 7 --tag default
//! ```

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use vcl_core::{CredentialDefinitionId, Did, RevocationRegistryId, SchemaId};

/// Identifier subcommand arguments.
#[derive(Args, Debug)]
pub struct IdArgs {
    #[command(subcommand)]
    pub command: IdCommand,
}

/// Available identifier operations.
#[derive(Subcommand, Debug)]
pub enum IdCommand {
    /// Decode a schema, credential definition or registry id into its parts.
    Parse {
        /// The identifier.
        id: String,
    },

    /// Encode parts into an identifier.
    #[command(subcommand)]
    Format(FormatCommand),
}

/// Identifier kinds that can be formatted.
#[derive(Subcommand, Debug)]
pub enum FormatCommand {
    /// `{did}:2:{name}:{version}`
    Schema {
        #[arg(long)]
        did: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        version: String,
    },

    /// `{did}:3:CL:{schema_seq_no}:{tag}`
    CredDef {
        #[arg(long)]
        did: String,
        #[arg(long)]
        schema_seq_no: u64,
        #[arg(long, default_value = "default")]
        tag: String,
    },

    /// `{did}:4:{cred_def_id}:CL_ACCUM:{tag}`
    RevReg {
        #[arg(long)]
        cred_def_id: String,
        #[arg(long)]
        tag: String,
    },
}

/// Execute the id subcommand.
pub fn run_id(args: &IdArgs) -> Result<u8> {
    match &args.command {
        IdCommand::Parse { id } => {
            let parts = describe(id)?;
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
        IdCommand::Format(kind) => println!("{}", format_id(kind)?),
    }
    Ok(0)
}

/// Decode `id` into a JSON description of its parts.
pub fn describe(id: &str) -> Result<Value> {
    if let Ok(rev_reg) = id.parse::<RevocationRegistryId>() {
        return Ok(json!({
            "kind": "rev_reg",
            "issuer_did": rev_reg.issuer_did().as_str(),
            "cred_def": describe_cred_def(rev_reg.cred_def_id()),
            "tag": rev_reg.tag(),
        }));
    }
    if let Ok(cred_def) = id.parse::<CredentialDefinitionId>() {
        return Ok(describe_cred_def(&cred_def));
    }
    match id.parse::<SchemaId>() {
        Ok(schema) => Ok(json!({
            "kind": "schema",
            "issuer_did": schema.issuer_did().as_str(),
            "name": schema.name(),
            "version": schema.version(),
        })),
        Err(e) => bail!("{id:?} is not a schema, credential definition or registry id: {e}"),
    }
}

fn describe_cred_def(id: &CredentialDefinitionId) -> Value {
    json!({
        "kind": "cred_def",
        "issuer_did": id.issuer_did().as_str(),
        "signature_type": id.signature_type().as_str(),
        "schema_seq_no": id.schema_seq_no(),
        "tag": id.tag(),
    })
}

/// Encode parts into an identifier string.
pub fn format_id(kind: &FormatCommand) -> Result<String> {
    let id = match kind {
        FormatCommand::Schema { did, name, version } => {
            SchemaId::new(Did::new(did.as_str())?, name.as_str(), version.as_str())?.to_string()
        }
        FormatCommand::CredDef {
            did,
            schema_seq_no,
            tag,
        } => CredentialDefinitionId::new(Did::new(did.as_str())?, *schema_seq_no, tag.as_str())?
            .to_string(),
        FormatCommand::RevReg { cred_def_id, tag } => {
            RevocationRegistryId::new(cred_def_id.parse()?, tag.as_str())?.to_string()
        }
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DID: &str = "NcYxiDXkpYi6ov5FcYDi1e";

    #[test]
    fn test_describe_schema() {
        let parts = describe(&format!("{DID}:2:gvt:1.0")).unwrap();
        assert_eq!(parts["kind"], "schema");
        assert_eq!(parts["name"], "gvt");
        assert_eq!(parts["version"], "1.0");
    }

    #[test]
    fn test_describe_cred_def() {
        let parts = describe(&format!("{DID}:3:CL:7:default")).unwrap();
        assert_eq!(parts["kind"], "cred_def");
        assert_eq!(parts["schema_seq_no"], 7);
        assert_eq!(parts["signature_type"], "CL");
    }

    #[test]
    fn test_describe_rev_reg_nests_cred_def() {
        let parts = describe(&format!("{DID}:4:{DID}:3:CL:7:default:CL_ACCUM:r1")).unwrap();
        assert_eq!(parts["kind"], "rev_reg");
        assert_eq!(parts["tag"], "r1");
        assert_eq!(parts["cred_def"]["tag"], "default");
    }

    #[test]
    fn test_describe_rejects_garbage() {
        assert!(describe("not-an-id").is_err());
    }

    #[test]
    fn test_format_then_describe() {
        let id = format_id(&FormatCommand::CredDef {
            did: DID.into(),
            schema_seq_no: 12,
            tag: "t".into(),
        })
        .unwrap();
        assert_eq!(id, format!("{DID}:3:CL:12:t"));

        let rev_reg = format_id(&FormatCommand::RevReg {
            cred_def_id: id,
            tag: "r".into(),
        })
        .unwrap();
        assert_eq!(describe(&rev_reg).unwrap()["kind"], "rev_reg");
    }

    #[test]
    fn test_format_rejects_zero_seq_no() {
        assert!(format_id(&FormatCommand::CredDef {
            did: DID.into(),
            schema_seq_no: 0,
            tag: "t".into(),
        })
        .is_err());
    }
}
