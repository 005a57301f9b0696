//! Static catalogue of the supporting documents an application can ask for.

use serde::Serialize;

use super::domain::{ApplicantKey, DocumentTypeId};

/// Whether a document belongs to the application as a whole or to one person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    General,
    Applicant,
}

impl DocumentCategory {
    pub fn fits(self, key: &ApplicantKey) -> bool {
        match self {
            DocumentCategory::General => !key.is_person(),
            DocumentCategory::Applicant => key.is_person(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTypeDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: DocumentCategory,
    /// Repeatable kinds accept several files per applicant.
    pub repeatable: bool,
}

impl DocumentTypeDescriptor {
    pub fn type_id(&self) -> DocumentTypeId {
        DocumentTypeId::from(self.id)
    }
}

const fn general(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    repeatable: bool,
) -> DocumentTypeDescriptor {
    DocumentTypeDescriptor {
        id,
        title,
        description,
        category: DocumentCategory::General,
        repeatable,
    }
}

const fn applicant(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    repeatable: bool,
) -> DocumentTypeDescriptor {
    DocumentTypeDescriptor {
        id,
        title,
        description,
        category: DocumentCategory::Applicant,
        repeatable,
    }
}

pub const MELDEBESCHEINIGUNG: &str = "meldebescheinigung";
pub const EIGENKAPITAL_NACHWEIS: &str = "eigenkapital_nachweis";
pub const MARRIAGE_CERT: &str = "marriage_cert";
pub const PREGNANCY_CERT: &str = "pregnancy-cert";
pub const VOLLMACHT_CERT: &str = "vollmacht-cert";
pub const DISABILITY_CERT: &str = "disability-cert";
pub const PFLEGEGRAD_NACHWEIS: &str = "pflegegrad-nachweis";
pub const BAUZEICHNUNG: &str = "bauzeichnung";
pub const LAGEPLAN: &str = "lageplan";
pub const BERECHNUNG_WOHNFLAECHE: &str = "berechnung_wohnflaeche";
pub const BAUGENEHMIGUNG_VORBESCHEID: &str = "baugenehmigung_vorbescheid";
pub const GRUNDBUCHBLATTKOPIE: &str = "grundbuchblattkopie";
pub const ERBBAURECHTSVERTRAG: &str = "erbbaurechtsvertrag";
pub const KAUFVERTRAG: &str = "kaufvertrag";
pub const BERGSENKUNGSGEBIET_ERKLAERUNG: &str = "bergsenkungsgebiet_erklaerung";
pub const DARLEHENSZUSAGE: &str = "darlehenszusage";
pub const EFFIZIENZHAUS40_NACHWEIS: &str = "effizienzhaus40_nachweis";
pub const BARRIEREFREI_NACHWEIS: &str = "barrierefrei_nachweis";
pub const HOLZBAU_NACHWEIS: &str = "holzbau_nachweis";
pub const STANDORTBEDINGTE_MEHRKOSTEN: &str = "standortbedingte_mehrkosten";

pub const LOHN_GEHALTSBESCHEINIGUNGEN: &str = "lohn_gehaltsbescheinigungen";
pub const EINKOMMENSSTEUERBESCHEID: &str = "einkommenssteuerbescheid";
pub const EINKOMMENSSTEUERERKLAERUNG: &str = "einkommenssteuererklaerung";
pub const RENTENBESCHEID: &str = "rentenbescheid";
pub const ARBEITSLOSENGELDBESCHEID: &str = "arbeitslosengeldbescheid";
pub const WERBUNGSKOSTEN_NACHWEIS: &str = "werbungskosten_nachweis";
pub const KINDERBETREUUNGSKOSTEN_NACHWEIS: &str = "kinderbetreuungskosten_nachweis";
pub const UNTERHALTSVERPFLICHTUNG_NACHWEIS: &str = "unterhaltsverpflichtung_nachweis";
pub const UNTERHALTSLEISTUNGEN_NACHWEIS: &str = "unterhaltsleistungen_nachweis";
pub const KRANKENGELD_NACHWEIS: &str = "krankengeld_nachweis";
pub const ELTERNGELD_NACHWEIS: &str = "elterngeld_nachweis";
pub const GUV_EUER_NACHWEIS: &str = "guv_euer_nachweis";
pub const AUSBILDUNGSFOERDERUNG_NACHWEIS: &str = "ausbildungsfoerderung_nachweis";

static CATALOGUE: &[DocumentTypeDescriptor] = &[
    general(
        MELDEBESCHEINIGUNG,
        "Meldebescheinigung",
        "Meldebescheinigung aller Personen, die das Förderobjekt beziehen werden.",
        true,
    ),
    general(
        EIGENKAPITAL_NACHWEIS,
        "Nachweis über die Verfügbarkeit des Eigenkapitals",
        "Kontoauszüge, Sparbücher oder Depotauszüge über das eingesetzte Eigenkapital.",
        true,
    ),
    general(
        MARRIAGE_CERT,
        "Heiratsurkunde",
        "Heirats- oder Lebenspartnerschaftsurkunde.",
        false,
    ),
    general(
        PREGNANCY_CERT,
        "Schwangerschaftsnachweis",
        "Ärztliche Bescheinigung oder Kopie des Mutterpasses.",
        false,
    ),
    general(
        VOLLMACHT_CERT,
        "Vollmachtsurkunde",
        "Vollmacht der bevollmächtigten Person für die Antragstellung.",
        false,
    ),
    general(
        DISABILITY_CERT,
        "Nachweis über die Schwerbehinderung",
        "Schwerbehindertenausweis oder Feststellungsbescheid über den Grad der Behinderung.",
        true,
    ),
    general(
        PFLEGEGRAD_NACHWEIS,
        "Nachweis über den Pflegegrad",
        "Bescheid der Pflegekasse über die Einstufung in einen Pflegegrad.",
        true,
    ),
    general(
        BAUZEICHNUNG,
        "Bauzeichnung",
        "Grundrisse, Schnitte und Ansichten im Maßstab 1:100.",
        true,
    ),
    general(
        LAGEPLAN,
        "Lageplan",
        "Amtlicher Lageplan des Baugrundstücks.",
        false,
    ),
    general(
        BERECHNUNG_WOHNFLAECHE,
        "Berechnung der Wohn- und Nutzfläche",
        "Wohnflächenberechnung nach WoFlV und Nutzflächenberechnung nach DIN 277.",
        false,
    ),
    general(
        BAUGENEHMIGUNG_VORBESCHEID,
        "Baugenehmigung oder Vorbescheid",
        "Erteilte Baugenehmigung oder positiver Bauvorbescheid.",
        false,
    ),
    general(
        GRUNDBUCHBLATTKOPIE,
        "Grundbuchblattkopie",
        "Aktueller Auszug aus dem Grundbuch des Baugrundstücks.",
        false,
    ),
    general(
        ERBBAURECHTSVERTRAG,
        "Erbbaurechtsvertrag",
        "Notariell beurkundeter Erbbaurechtsvertrag.",
        false,
    ),
    general(
        KAUFVERTRAG,
        "Kaufvertrag",
        "Notarieller Kaufvertrag oder dessen Entwurf.",
        false,
    ),
    general(
        BERGSENKUNGSGEBIET_ERKLAERUNG,
        "Stellungnahme zum Bergsenkungsgebiet",
        "Stellungnahme des Bergbauberechtigten zur Bergschadensgefährdung.",
        false,
    ),
    general(
        DARLEHENSZUSAGE,
        "Darlehenszusage",
        "Zusagen aller Fremdfinanzierungsmittel aus dem Finanzierungsplan.",
        true,
    ),
    general(
        EFFIZIENZHAUS40_NACHWEIS,
        "Nachweis Effizienzhaus 40",
        "Bestätigung eines Energieeffizienz-Experten über den Effizienzhaus-40-Standard.",
        false,
    ),
    general(
        BARRIEREFREI_NACHWEIS,
        "Nachweis über barrierefreies Bauen",
        "Bestätigung der Architektin oder des Architekten über die barrierefreie Ausführung.",
        false,
    ),
    general(
        HOLZBAU_NACHWEIS,
        "Nachweis über die Holzbauweise",
        "Bestätigung über den Anteil nachwachsender Rohstoffe in der Konstruktion.",
        false,
    ),
    general(
        STANDORTBEDINGTE_MEHRKOSTEN,
        "Nachweis standortbedingter Mehrkosten",
        "Kostenaufstellung über standortbedingte Mehrkosten (z. B. Baugrund, Abbruch).",
        true,
    ),
    applicant(
        LOHN_GEHALTSBESCHEINIGUNGEN,
        "Lohn- und Gehaltsbescheinigungen",
        "Lohn- und Gehaltsbescheinigungen der letzten zwölf Monate.",
        true,
    ),
    applicant(
        EINKOMMENSSTEUERBESCHEID,
        "Einkommensteuerbescheid",
        "Letzter Einkommensteuerbescheid.",
        false,
    ),
    applicant(
        EINKOMMENSSTEUERERKLAERUNG,
        "Einkommensteuererklärung",
        "Letzte abgegebene Einkommensteuererklärung.",
        false,
    ),
    applicant(
        RENTENBESCHEID,
        "Rentenbescheid",
        "Aktueller Renten- oder Versorgungsbescheid.",
        true,
    ),
    applicant(
        ARBEITSLOSENGELDBESCHEID,
        "Arbeitslosengeldbescheid",
        "Bewilligungsbescheid über Arbeitslosengeld.",
        false,
    ),
    applicant(
        WERBUNGSKOSTEN_NACHWEIS,
        "Nachweis über Werbungskosten",
        "Belege über Werbungskosten, die über den Pauschbetrag hinausgehen.",
        true,
    ),
    applicant(
        KINDERBETREUUNGSKOSTEN_NACHWEIS,
        "Nachweis über Kinderbetreuungskosten",
        "Rechnungen oder Bescheinigungen über Kinderbetreuungskosten.",
        true,
    ),
    applicant(
        UNTERHALTSVERPFLICHTUNG_NACHWEIS,
        "Nachweis über Unterhaltsverpflichtungen",
        "Urteil, Vergleich oder Zahlungsbelege über geleisteten Unterhalt.",
        true,
    ),
    applicant(
        UNTERHALTSLEISTUNGEN_NACHWEIS,
        "Nachweis über erhaltene Unterhaltsleistungen",
        "Nachweise über empfangene Unterhaltszahlungen.",
        true,
    ),
    applicant(
        KRANKENGELD_NACHWEIS,
        "Nachweis über Krankengeld",
        "Bescheinigung der Krankenkasse über gezahltes Krankengeld.",
        false,
    ),
    applicant(
        ELTERNGELD_NACHWEIS,
        "Elterngeldbescheid",
        "Bewilligungsbescheid über Elterngeld.",
        false,
    ),
    applicant(
        GUV_EUER_NACHWEIS,
        "Gewinn- und Verlustrechnung / Einnahmenüberschussrechnung",
        "Gewinnermittlung des letzten abgeschlossenen Wirtschaftsjahres.",
        true,
    ),
    applicant(
        AUSBILDUNGSFOERDERUNG_NACHWEIS,
        "Nachweis über Ausbildungsförderung",
        "Bescheid über BAföG oder Berufsausbildungsbeihilfe.",
        false,
    ),
];

/// Every catalogue entry, in declaration order.
pub fn all() -> &'static [DocumentTypeDescriptor] {
    CATALOGUE
}

pub fn descriptor(id: &str) -> Option<&'static DocumentTypeDescriptor> {
    CATALOGUE.iter().find(|descriptor| descriptor.id == id)
}

pub fn by_category(category: DocumentCategory) -> impl Iterator<Item = &'static DocumentTypeDescriptor> {
    CATALOGUE
        .iter()
        .filter(move |descriptor| descriptor.category == category)
}

/// Unknown ids are treated as single-file kinds.
pub fn is_repeatable(id: &DocumentTypeId) -> bool {
    descriptor(id.as_str())
        .map(|descriptor| descriptor.repeatable)
        .unwrap_or(false)
}

/// Display title, falling back to the raw id for documents no longer in the catalogue.
pub fn title_of(id: &DocumentTypeId) -> &str {
    match descriptor(id.as_str()) {
        Some(descriptor) => descriptor.title,
        None => id.as_str(),
    }
}
