use crate::infra::InMemoryCollaborators;
use clap::Args;
use std::path::{Path, PathBuf};
use subsidy_intake::config::{ProgressConfig, UploadConfig};
use subsidy_intake::documents::facts::{
    AdditionalApplicantFacts, HouseholdFacts, IncomeFacts, ObjectFacts, PersonFacts,
    SubsidyVariant,
};
use subsidy_intake::documents::registry::{self, LOHN_GEHALTSBESCHEINIGUNGEN, MELDEBESCHEINIGUNG};
use subsidy_intake::documents::{
    derive_requirements, ApplicantKey, ApplicationFacts, DocumentOverview, DocumentService,
    SlotClassification, UploadPhase, UserId,
};
use subsidy_intake::error::AppError;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct RequirementsArgs {
    /// JSON file holding the application facts
    #[arg(long)]
    pub(crate) facts: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// JSON file holding the application facts (defaults to a built-in household)
    #[arg(long)]
    pub(crate) facts: Option<PathBuf>,
    /// User id the demo documents are stored under
    #[arg(long, default_value = "demo-user")]
    pub(crate) user: String,
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let facts = read_facts(&args.facts)?;
    let required = derive_requirements(&facts);
    println!("{}", serde_json::to_string_pretty(&required)?);
    Ok(())
}

fn read_facts(path: &Path) -> Result<ApplicationFacts, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn sample_facts() -> ApplicationFacts {
    ApplicationFacts {
        household: HouseholdFacts {
            is_married: Some(true),
            is_pregnant: Some(true),
            ..HouseholdFacts::default()
        },
        object: ObjectFacts {
            subsidy_variant: Some(SubsidyVariant::Neubau),
            ..ObjectFacts::default()
        },
        main_applicant: PersonFacts {
            first_name: Some("Alex".to_string()),
            last_name: Some("Beispiel".to_string()),
            income: IncomeFacts {
                has_salary: Some(true),
                other_income_types: vec!["Krankengeld".to_string()],
                ..IncomeFacts::default()
            },
        },
        additional_applicants: vec![AdditionalApplicantFacts {
            uuid: Uuid::new_v4(),
            person: PersonFacts {
                income: IncomeFacts {
                    has_pension: Some(true),
                    ..IncomeFacts::default()
                },
                ..PersonFacts::default()
            },
        }],
        ..ApplicationFacts::default()
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let facts = match &args.facts {
        Some(path) => read_facts(path)?,
        None => sample_facts(),
    };
    let user = UserId(args.user);

    let collaborators = InMemoryCollaborators::new();
    collaborators
        .facts
        .replace(&user, facts)
        .map_err(subsidy_intake::documents::DocumentServiceError::from)?;
    let upload = UploadConfig {
        completion_hold: std::time::Duration::from_millis(100),
        ..UploadConfig::default()
    };
    let service = DocumentService::new(collaborators.stores, upload, ProgressConfig::default());

    println!("Document intake demo for {user}");
    let overview = service.load(&user).await;
    print_requirements(&overview);

    let mut events = service.pipeline(&user).subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if event.phase != UploadPhase::Uploading {
                println!("  [{}] {:?} {}%", event.slot_id, event.phase, event.percent);
            }
        }
    });

    println!("\nUploading");
    service
        .upload(
            &user,
            ApplicantKey::General,
            MELDEBESCHEINIGUNG.into(),
            "meldebescheinigung.pdf",
            vec![0; 64 * 1024],
        )
        .await?;
    let overview = service
        .upload(
            &user,
            ApplicantKey::Main,
            LOHN_GEHALTSBESCHEINIGUNGEN.into(),
            "gehalt-januar.pdf",
            vec![0; 128 * 1024],
        )
        .await?;
    print_slots(&overview);

    println!("\nRemoving gehalt-januar.pdf");
    let uploaded_at = overview
        .workspace
        .slots
        .iter()
        .filter_map(|slot| slot.file.as_ref())
        .find(|file| file.file_name == "gehalt-januar.pdf")
        .map(|file| file.uploaded_at);
    let overview = match uploaded_at {
        Some(uploaded_at) => {
            service
                .remove(
                    &user,
                    ApplicantKey::Main,
                    &LOHN_GEHALTSBESCHEINIGUNGEN.into(),
                    "gehalt-januar.pdf",
                    uploaded_at,
                )
                .await?
        }
        None => {
            println!("  File not found on any slot");
            overview
        }
    };
    printer.abort();

    print_slots(&overview);
    println!("\nStored objects: {}", collaborators.blobs.len());
    println!("Completion score: {}%", overview.workspace.progress);
    Ok(())
}

fn applicant_label(overview: &DocumentOverview, key: &ApplicantKey) -> String {
    overview
        .workspace
        .applicants
        .iter()
        .find(|view| &view.key == key)
        .map(|view| view.display_name.clone())
        .unwrap_or_else(|| key.to_string())
}

fn print_requirements(overview: &DocumentOverview) {
    println!("\nRequired documents");
    for (key, documents) in overview.workspace.requirements.entries() {
        if documents.is_empty() {
            continue;
        }
        println!("  {}:", applicant_label(overview, &key));
        for document in documents {
            println!("    - {}", registry::title_of(document));
        }
    }
}

fn print_slots(overview: &DocumentOverview) {
    println!("\nSlots");
    for slot in &overview.workspace.slots {
        let title = slot
            .document_type_id
            .as_ref()
            .map(registry::title_of)
            .unwrap_or("(no documents yet)");
        let kind = match slot.classification {
            SlotClassification::Required => "required",
            SlotClassification::Optional => "optional",
            SlotClassification::Placeholder => "placeholder",
        };
        let file = slot
            .file
            .as_ref()
            .map(|file| file.file_name.as_str())
            .unwrap_or("-");
        println!(
            "  {:<28} {:<48} {:<11} {}",
            applicant_label(overview, &slot.applicant_key),
            title,
            kind,
            file
        );
    }
}
