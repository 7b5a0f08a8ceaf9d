//! Artifact signing into the local staging area
//!
//! Every bundle is signed with the imported key and deployed to the
//! `file://` staging area in one `sign-and-deploy-file` call. The first
//! failure aborts the run; a partially staged set is never uploaded.

use crate::core::bundle::ArtifactBundle;
use crate::core::context::PublishContext;
use crate::core::error::PublishError;
use crate::core::traits::ToolInvocation;
use crate::core::workspace::SIGN_LOG;
use crate::security::credential_store::PASSPHRASE_SERVER_ID;
use crate::security::key_importer::SigningSession;

/// Maven goal that signs a file set and deploys it
pub const SIGN_AND_DEPLOY_GOAL: &str =
    "org.apache.maven.plugins:maven-gpg-plugin:3.1.0:sign-and-deploy-file";

/// Signs bundles into the staging area
pub struct ArtifactSigner<'a> {
    ctx: &'a PublishContext,
}

impl<'a> ArtifactSigner<'a> {
    pub fn new(ctx: &'a PublishContext) -> Self {
        Self { ctx }
    }

    /// Sign and stage every bundle, in order
    pub async fn sign_all(&self, bundles: &[ArtifactBundle]) -> Result<usize, PublishError> {
        let session = self
            .ctx
            .signing
            .as_ref()
            .ok_or_else(|| PublishError::SigningFailed {
                bundle: "*".to_string(),
                message: "no signing key was imported".to_string(),
            })?;

        println!("🔏 Signing {} bundle(s)...", bundles.len());
        for bundle in bundles {
            self.sign(session, bundle).await?;
        }
        println!("  ✅ Staged in {}\n", self.ctx.workspace.staging_dir().display());

        Ok(bundles.len())
    }

    /// Build the signing invocation for one bundle
    pub fn invocation(&self, session: &SigningSession, bundle: &ArtifactBundle) -> ToolInvocation {
        let keyring = session.keyring.path().display().to_string();

        self.ctx
            .maven_invocation(SIGN_AND_DEPLOY_GOAL)
            .property("url", self.ctx.workspace.staging_url())
            .property("repositoryId", &self.ctx.config.server_id)
            .property("pomFile", bundle.descriptor.display().to_string())
            .property("file", bundle.binary.display().to_string())
            .property("sources", bundle.sources.display().to_string())
            .property("javadoc", bundle.javadoc.display().to_string())
            .property("gpg.keyname", session.keyring.key_id().as_str())
            .property("gpg.homedir", &keyring)
            .property("gpg.passphraseServerId", PASSPHRASE_SERVER_ID)
            .env("GNUPGHOME", keyring)
    }

    async fn sign(
        &self,
        session: &SigningSession,
        bundle: &ArtifactBundle,
    ) -> Result<(), PublishError> {
        println!("  🔏 {}", bundle.base_name);

        let invocation = self.invocation(session, bundle);
        let output = self
            .ctx
            .maven
            .run(&invocation)
            .await
            .map_err(|e| PublishError::SigningFailed {
                bundle: bundle.base_name.clone(),
                message: e.to_string(),
            })?;
        let log = self.ctx.capture(SIGN_LOG, &invocation, &output).await?;

        if !output.success() {
            return Err(PublishError::SigningFailed {
                bundle: bundle.base_name.clone(),
                message: format!("{} (see {})", output.status_text(), log.display()),
            });
        }

        Ok(())
    }
}
