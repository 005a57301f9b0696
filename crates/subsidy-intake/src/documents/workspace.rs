//! Explicit state container for one user's document page.

use serde::Serialize;

use super::applicants::{ApplicantDirectory, ApplicantView};
use super::domain::{OptionalSelections, RequiredDocumentSet, UploadedDocuments};
use super::facts::ApplicationFacts;
use super::reconcile::{reconcile, Reconciliation};
use super::requirements::derive_requirements;
use super::scoring::{score, FormProgress};
use super::slots::{materialize, Slot};

/// Transitions accepted by [`DocumentWorkspace::reduce`].
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    FactsChanged(ApplicationFacts),
    /// The fact store could not be read; requirements degrade to nothing.
    FactsUnavailable,
    OptionalChanged(OptionalSelections),
    UploadedChanged(UploadedDocuments),
    FormsChanged(FormProgress),
}

/// Requirements, selections, uploads and the projections computed from them.
///
/// Every transition re-runs reconciliation, materialisation and scoring, so the projections
/// never lag behind the inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWorkspace {
    facts: ApplicationFacts,
    directory: ApplicantDirectory,
    requirements: RequiredDocumentSet,
    optional: OptionalSelections,
    uploaded: UploadedDocuments,
    forms: FormProgress,
    slots: Vec<Slot>,
    progress: u8,
}

/// Serialisable snapshot handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceView {
    pub applicants: Vec<ApplicantView>,
    pub requirements: RequiredDocumentSet,
    pub optional: OptionalSelections,
    pub slots: Vec<Slot>,
    pub progress: u8,
}

impl DocumentWorkspace {
    /// Build a workspace from freshly loaded inputs. The returned reconciliation tells the
    /// caller whether corrected selections must be written back. `None` facts mean the fact
    /// store was unavailable.
    pub fn load(
        facts: Option<ApplicationFacts>,
        optional: OptionalSelections,
        uploaded: UploadedDocuments,
        forms: FormProgress,
    ) -> (Self, Reconciliation) {
        let mut workspace = Self {
            optional,
            uploaded,
            forms,
            ..Self::default()
        };
        workspace.apply_facts(facts);
        let reconciliation = workspace.settle();
        (workspace, reconciliation)
    }

    pub fn reduce(&mut self, event: WorkspaceEvent) -> Reconciliation {
        match event {
            WorkspaceEvent::FactsChanged(facts) => self.apply_facts(Some(facts)),
            WorkspaceEvent::FactsUnavailable => self.apply_facts(None),
            WorkspaceEvent::OptionalChanged(optional) => self.optional = optional,
            WorkspaceEvent::UploadedChanged(uploaded) => self.uploaded = uploaded,
            WorkspaceEvent::FormsChanged(forms) => self.forms = forms,
        }
        self.settle()
    }

    fn apply_facts(&mut self, facts: Option<ApplicationFacts>) {
        match facts {
            Some(facts) => {
                self.directory = ApplicantDirectory::from_facts(&facts);
                self.requirements = derive_requirements(&facts);
                self.facts = facts;
            }
            None => {
                self.directory = ApplicantDirectory::default();
                self.requirements = RequiredDocumentSet::default();
                self.facts = ApplicationFacts::default();
            }
        }
    }

    fn settle(&mut self) -> Reconciliation {
        let reconciliation = reconcile(&self.requirements, &self.optional, &self.uploaded);
        self.optional = reconciliation.optional.clone();
        self.slots = materialize(
            &self.directory,
            &self.requirements,
            &self.optional,
            &self.uploaded,
        );
        self.progress = score(&self.forms, &self.slots);
        reconciliation
    }

    pub fn facts(&self) -> &ApplicationFacts {
        &self.facts
    }

    pub fn directory(&self) -> &ApplicantDirectory {
        &self.directory
    }

    pub fn requirements(&self) -> &RequiredDocumentSet {
        &self.requirements
    }

    pub fn optional(&self) -> &OptionalSelections {
        &self.optional
    }

    pub fn uploaded(&self) -> &UploadedDocuments {
        &self.uploaded
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Directory applicants plus any bucket that only survives through its documents.
    fn applicant_views(&self) -> Vec<ApplicantView> {
        let mut views = self.directory.views();
        for slot in &self.slots {
            if !views.iter().any(|view| view.key == slot.applicant_key) {
                views.push(self.directory.view(slot.applicant_key));
            }
        }
        views
    }

    pub fn view(&self) -> WorkspaceView {
        WorkspaceView {
            applicants: self.applicant_views(),
            requirements: self.requirements.clone(),
            optional: self.optional.clone(),
            slots: self.slots.clone(),
            progress: self.progress,
        }
    }
}
