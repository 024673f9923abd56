//! Workflow coordination for the command line
//!
//! This module provides:
//! - The application update check: release manifest, development manifest,
//!   then the bundled manifest
//! - The MSFragger update check: update server manifest against the local jar
//! - Changelog selection for printing
//! - Stage configuration and pipeline assembly for a run

use crate::advisory::UpdateAdvisory;
use crate::cli::{ChangelogArgs, CheckUpdatesArgs};
use crate::config::{tool_roots, Bundle, RunConfig, MSFRAGGER_TITLE, PROGRAM_TITLE};
use crate::domain::{UpdatePackage, VersionAdvisory};
use crate::error::{AppError, ConfigError, SourceError};
use crate::locator::ToolLocator;
use crate::output::{ChangelogView, CheckedComponent, ReleaseDownloads, UpdateCheckReport};
use crate::pipeline::PipelineAssembler;
use crate::resolver::VersionResolver;
use crate::source::manifest::keys;
use crate::source::{
    BundledManifestSource, HttpClient, LocalInspectionSource, Manifest, RemoteManifestSource,
    VersionSource,
};
use crate::stage::{MoreRescore, Msfragger, PeptideProphet};
use crate::version::{builtin_changelog, ChangelogRegistry, VersionRecord};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Name of the release-branch manifest source
pub const RELEASE_SOURCE: &str = "release";

/// Name of the development-branch manifest source
pub const DEV_SOURCE: &str = "dev";

/// Name of the MSFragger update server source
pub const MSFRAGGER_SOURCE: &str = "msfragger-server";

/// Version sources of the application check
///
/// The remote sources are shared with the check task, so the manifests they
/// fetch stay readable after the check finished.
pub struct AppSources {
    release: Option<Arc<RemoteManifestSource>>,
    dev: Option<Arc<RemoteManifestSource>>,
    bundled: Arc<BundledManifestSource>,
}

impl AppSources {
    /// Version of the running application
    pub fn local(&self) -> VersionRecord {
        self.bundled.record()
    }

    /// Sources in priority order
    pub fn chain(&self) -> Vec<Box<dyn VersionSource>> {
        let mut chain: Vec<Box<dyn VersionSource>> = Vec::with_capacity(3);
        if let Some(release) = &self.release {
            chain.push(Box::new(release.clone()));
        }
        if let Some(dev) = &self.dev {
            chain.push(Box::new(dev.clone()));
        }
        chain.push(Box::new(self.bundled.clone()));
        chain
    }

    /// Resolver for this chain
    ///
    /// The release manifest is authoritative: the development manifest is
    /// only read when the release version cannot be fetched.
    pub fn resolver(&self) -> VersionResolver {
        VersionResolver::new(PROGRAM_TITLE).first_answer_decides()
    }

    /// The fetched remote manifest that best matches `source`
    ///
    /// Empty when no remote manifest could be fetched.
    pub fn manifest_for(&self, source: Option<&str>) -> Manifest {
        let release = self.release.as_ref().and_then(|s| s.manifest());
        let dev = self.dev.as_ref().and_then(|s| s.manifest());
        let picked = match source {
            Some(DEV_SOURCE) => dev.or(release),
            _ => release.or(dev),
        };
        picked.cloned().unwrap_or_default()
    }
}

/// Coordinates update checks, changelog output and pipeline assembly
pub struct Orchestrator {
    bundle: Bundle,
    /// `None` when running offline
    client: Option<HttpClient>,
}

impl Orchestrator {
    /// Create an orchestrator over the embedded bundle
    pub fn new(offline: bool) -> Result<Self, SourceError> {
        let client = if offline {
            None
        } else {
            Some(HttpClient::new()?)
        };
        Ok(Self::with_parts(Bundle::embedded(), client))
    }

    /// Create an orchestrator with a custom bundle and client (for testing)
    pub fn with_parts(bundle: Bundle, client: Option<HttpClient>) -> Self {
        Self { bundle, client }
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    fn default_download_url(&self) -> String {
        self.bundle.download_url().unwrap_or_default().to_string()
    }

    /// Build the application's version sources
    pub fn app_sources(&self) -> AppSources {
        let remote = |name: &str, urls: Vec<String>, key: &str| {
            self.client.as_ref().map(|client| {
                Arc::new(
                    RemoteManifestSource::new(name, client.clone(), urls, key)
                        .with_download_key(keys::DOWNLOAD_URL)
                        .with_fallback_url(self.default_download_url()),
                )
            })
        };

        AppSources {
            release: remote(
                RELEASE_SOURCE,
                self.bundle.release_manifest_urls(),
                keys::LAST_RELEASE_VERSION,
            ),
            dev: remote(DEV_SOURCE, self.bundle.dev_manifest_urls(), keys::VERSION),
            bundled: Arc::new(BundledManifestSource::new(
                self.bundle.manifest().clone(),
                keys::VERSION,
                keys::DOWNLOAD_URL,
            )),
        }
    }

    /// Turn a finished application check into a notice
    pub fn app_notice(&self, sources: &AppSources, mut advisory: VersionAdvisory) -> CheckedComponent {
        let manifest = sources.manifest_for(advisory.source.as_deref());
        let message = UpdateAdvisory::new(&manifest, builtin_changelog())
            .with_default_download_url(self.default_download_url())
            .build_message(&mut advisory);
        CheckedComponent { advisory, message }
    }

    /// Check the application itself
    ///
    /// Also returns the add-on packages the fetched manifest offers for the
    /// running version.
    pub async fn check_app(&self) -> (CheckedComponent, Vec<UpdatePackage>) {
        let sources = self.app_sources();
        let local = sources.local();
        let advisory = sources.resolver().resolve(&local, &sources.chain()).await;

        let packages = match local.version() {
            Some(version) => {
                let manifest = sources.manifest_for(advisory.source.as_deref());
                UpdateAdvisory::new(&manifest, builtin_changelog()).applicable_packages(version)
            }
            None => Vec::new(),
        };
        (self.app_notice(&sources, advisory), packages)
    }

    /// Check an MSFragger jar against the update server
    pub async fn check_msfragger(&self, jar: &Path, java: &Path) -> CheckedComponent {
        let local_source = LocalInspectionSource::new(jar, java)
            .with_download_url(self.bundle.msfragger_download_url());
        let local = local_source.inspect().await;

        let mut sources: Vec<Box<dyn VersionSource>> = Vec::new();
        if let Some(client) = &self.client {
            sources.push(Box::new(
                RemoteManifestSource::new(
                    MSFRAGGER_SOURCE,
                    client.clone(),
                    self.bundle.msfragger_manifest_urls(),
                    keys::MSFRAGGER_VERSION,
                )
                .with_download_key(keys::MSFRAGGER_DOWNLOAD_URL)
                .with_fallback_url(local_source.download_url()),
            ));
        }

        let mut advisory = VersionResolver::new(MSFRAGGER_TITLE)
            .resolve(&local, &sources)
            .await;
        let no_notes = Manifest::default();
        let no_changelog = ChangelogRegistry::new();
        let message = UpdateAdvisory::new(&no_notes, &no_changelog)
            .with_default_download_url(local_source.download_url())
            .build_message(&mut advisory);
        CheckedComponent { advisory, message }
    }

    /// Run the checks requested on the command line
    pub async fn check_updates(&self, args: &CheckUpdatesArgs) -> UpdateCheckReport {
        let (app, packages) = self.check_app().await;
        let mut report = UpdateCheckReport {
            components: vec![app],
            packages,
        };

        if let Some(jar) = &args.msfragger_jar {
            let locator = ToolLocator::new(tool_roots(&args.tools));
            let component = match locator.resolve(&[jar.as_str()]) {
                Ok(paths) => self.check_msfragger(&paths[0], &args.java).await,
                Err(e) => {
                    log::warn!("cannot check {}: {}", MSFRAGGER_TITLE, e);
                    CheckedComponent {
                        advisory: VersionAdvisory::up_to_date(MSFRAGGER_TITLE, None),
                        message: None,
                    }
                }
            };
            report.components.push(component);
        }

        report
    }

    /// Start the application check in the background
    pub fn spawn_app_check(
        &self,
        cancel: CancellationToken,
    ) -> (
        AppSources,
        tokio::sync::mpsc::Receiver<VersionAdvisory>,
        tokio::task::JoinHandle<()>,
    ) {
        let sources = self.app_sources();
        let (rx, handle) = sources
            .resolver()
            .spawn_check(sources.local(), sources.chain(), cancel);
        (sources, rx, handle)
    }

    /// Select changelog entries, newest first
    pub fn changelog_view(&self, args: &ChangelogArgs) -> Result<ChangelogView, ConfigError> {
        self.changelog_view_from(builtin_changelog(), args)
    }

    /// Select entries from `changelog`
    pub fn changelog_view_from(
        &self,
        changelog: &ChangelogRegistry,
        args: &ChangelogArgs,
    ) -> Result<ChangelogView, ConfigError> {
        let entries = match &args.since {
            Some(since) => changelog.changes_since(since, args.limit),
            None => {
                let mut all = changelog.entries_descending();
                if args.limit > 0 {
                    all.truncate(args.limit);
                }
                all
            }
        };

        let release = if args.release_notes {
            Some(ReleaseDownloads::new(
                self.bundle.version()?,
                self.bundle.download_url()?,
            ))
        } else {
            None
        };

        Ok(ChangelogView { release, entries })
    }

    /// Configure the stages a run needs and queue them in order
    pub fn assemble(
        config: &RunConfig,
        cancel: CancellationToken,
    ) -> Result<PipelineAssembler, AppError> {
        let ctx = config.stage_context();
        let mut assembler = PipelineAssembler::new().with_cancellation(cancel);

        let mut msfragger = Msfragger::new(config.work_dir.clone());
        msfragger.configure(&ctx, &config.msfragger_params())?;
        assembler.add(&msfragger)?;

        if config.more_rescore {
            let mut more_rescore = MoreRescore::new(config.work_dir.clone());
            more_rescore.configure(&ctx, &config.more_rescore_params())?;
            assembler.add(&more_rescore)?;
        }

        if let Some(params) = config.peptide_prophet_params() {
            let mut peptide_prophet = PeptideProphet::new(config.work_dir.clone());
            peptide_prophet.configure(&ctx, &params)?;
            assembler.add(&peptide_prophet)?;
        }

        Ok(assembler)
    }
}
