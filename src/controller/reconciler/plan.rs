//! # Plan
//!
//! The decision half of a pass: a pure function from [`Snapshot`] to the
//! resulting [`Outcome`] and the ordered store mutations that realize it.
//!
//! Precedence, first match wins:
//!
//! 1. No authority: Blocked, no steps at all
//! 2. Credential handle cannot be dereferenced: Blocked + cleanup
//! 3. Domain or token missing: Blocked naming every missing item + cleanup
//! 4. No credential channel: Waiting + cleanup
//! 5. Otherwise converge: Active
//!
//! Cleanup clears the resolver hint and revokes the credential on the
//! credential channel, and retracts the ingress record, for whichever
//! channels are present.

use crate::constants::{CONFIG_DOMAIN, CONFIG_TUNNEL_TOKEN};
use crate::controller::reconciler::snapshot::{CredentialInput, Snapshot};
use crate::controller::reconciler::types::{Hold, Outcome};
use crate::provider::Channel;
use crate::relation::{derive_url, TunnelToken};

/// One store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    PublishCredential {
        channel: Channel,
        token: TunnelToken,
    },
    /// Set the resolver hint, or clear it when `None`
    AnnounceNameserver {
        channel: Channel,
        nameserver: Option<String>,
    },
    RevokeCredential {
        channel: Channel,
    },
    PublishIngress {
        channel: Channel,
        url: String,
    },
    RetractIngress {
        channel: Channel,
    },
}

impl Step {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Step::PublishCredential { .. } => "publish-credential",
            Step::AnnounceNameserver { .. } => "announce-nameserver",
            Step::RevokeCredential { .. } => "revoke-credential",
            Step::PublishIngress { .. } => "publish-ingress",
            Step::RetractIngress { .. } => "retract-ingress",
        }
    }

    #[must_use]
    pub fn channel(&self) -> &Channel {
        match self {
            Step::PublishCredential { channel, .. }
            | Step::AnnounceNameserver { channel, .. }
            | Step::RevokeCredential { channel }
            | Step::PublishIngress { channel, .. }
            | Step::RetractIngress { channel } => channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub outcome: Outcome,
    pub steps: Vec<Step>,
}

struct Converge<'a> {
    domain: &'a str,
    token: &'a TunnelToken,
    channel: &'a Channel,
}

fn evaluate(snapshot: &Snapshot) -> Result<Converge<'_>, Hold> {
    if !snapshot.has_authority {
        return Err(Hold::NotSoleAuthority);
    }
    if let CredentialInput::Invalid(reason) = &snapshot.credential {
        return Err(Hold::InvalidCredential(reason.clone()));
    }

    let domain = snapshot.domain.as_deref().map(str::trim).filter(|d| !d.is_empty());
    let token = snapshot.credential.token();
    let mut missing = Vec::new();
    if domain.is_none() {
        missing.push(CONFIG_DOMAIN);
    }
    if token.is_none() {
        missing.push(CONFIG_TUNNEL_TOKEN);
    }
    let (Some(domain), Some(token)) = (domain, token) else {
        return Err(Hold::IncompleteConfiguration(missing));
    };

    let channel = snapshot
        .credential_channel
        .as_ref()
        .ok_or_else(|| Hold::ChannelAbsent(snapshot.credential_relation.clone()))?;

    Ok(Converge {
        domain,
        token,
        channel,
    })
}

fn cleanup(snapshot: &Snapshot) -> Vec<Step> {
    let mut steps = Vec::new();
    if let Some(channel) = &snapshot.credential_channel {
        steps.push(Step::AnnounceNameserver {
            channel: channel.clone(),
            nameserver: None,
        });
        steps.push(Step::RevokeCredential {
            channel: channel.clone(),
        });
    }
    if let Some(channel) = &snapshot.ingress_channel {
        steps.push(Step::RetractIngress {
            channel: channel.clone(),
        });
    }
    steps
}

/// Decide the outcome of a pass and the mutations it performs
#[must_use]
pub fn plan(snapshot: &Snapshot) -> Plan {
    match evaluate(snapshot) {
        Ok(converge) => {
            let mut steps = vec![
                Step::PublishCredential {
                    channel: converge.channel.clone(),
                    token: converge.token.clone(),
                },
                Step::AnnounceNameserver {
                    channel: converge.channel.clone(),
                    nameserver: snapshot.nameserver.clone(),
                },
            ];
            if let Some(channel) = &snapshot.ingress_channel {
                steps.push(Step::PublishIngress {
                    channel: channel.clone(),
                    url: derive_url(converge.domain),
                });
            }
            Plan {
                outcome: Outcome::Active,
                steps,
            }
        }
        Err(hold) => Plan {
            outcome: hold.outcome(),
            steps: if hold.requires_cleanup() {
                cleanup(snapshot)
            } else {
                Vec::new()
            },
        },
    }
}
