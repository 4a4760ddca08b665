// Line-oriented command parsing for the interactive loop

use std::path::PathBuf;

use carecompass_types::{Insurance, Profile, ProfilePatch, Vitals};

pub const HELP: &str = "\
Type a question to chat. Ctrl-C stops a streaming answer, or exits at the prompt.

  /patients                         list profiles
  /switch <id>                      switch profile
  /add <name>                       create a profile
  /threads                          list conversations
  /open <thread-id>                 continue a conversation
  /new                              start a new conversation
  /context                          show the patient context sent to the assistant
  /profile name=.. dob=.. age=.. insurance=.. member=.. group=..
                                    edit the current profile
  /condition add|remove <condition> edit the condition list
  /vitals bp=.. hr=.. height=.. weight=.. other=..
  /doctor <name> [| type | phone]   add a doctor
  /med <name> [| dosage | frequency]
                                    add a medication
  /files                            list stored files
  /upload <path>                    upload a file
  /analyze <path>                   analyze a local image or document
  /analyze-file <file-id>           analyze a stored file
  /link <file-id>                   print a download link
  /delete-file <file-id>            delete a stored file
  /export <path>                    export the current profile and chats
  /import <path>                    import an exported profile
  /help                             show this help
  /quit                             exit";

/// Partial vitals from `/vitals key=value ...`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VitalsUpdate {
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub other: Option<String>,
}

impl VitalsUpdate {
    pub fn apply(&self, current: &Vitals) -> Vitals {
        let mut next = current.clone();
        let fields = [
            (&self.blood_pressure, &mut next.blood_pressure),
            (&self.heart_rate, &mut next.heart_rate),
            (&self.height, &mut next.height),
            (&self.weight, &mut next.weight),
            (&self.other, &mut next.other_vitals),
        ];
        for (update, slot) in fields {
            if let Some(value) = update {
                *slot = value.clone();
            }
        }
        next
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial demographics and insurance from `/profile key=value ...`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub age: Option<String>,
    pub insurance_provider: Option<String>,
    pub member_id: Option<String>,
    pub group_id: Option<String>,
}

impl ProfileUpdate {
    /// Insurance is replaced as a whole, so unset parts keep the current values
    pub fn patch(&self, current: &Profile) -> ProfilePatch {
        let touches_insurance = self.insurance_provider.is_some()
            || self.member_id.is_some()
            || self.group_id.is_some();
        let insurance = touches_insurance.then(|| Insurance {
            provider: pick(&self.insurance_provider, &current.insurance.provider),
            member_id: pick(&self.member_id, &current.insurance.member_id),
            group_id: pick(&self.group_id, &current.insurance.group_id),
        });

        ProfilePatch {
            name: self.name.clone(),
            dob: self.dob.clone(),
            age: self.age.clone(),
            insurance,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn pick(update: &Option<String>, current: &str) -> String {
    update.clone().unwrap_or_else(|| current.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionEdit {
    Add(String),
    Remove(String),
}

impl ConditionEdit {
    /// New condition list. Adding a condition already present is a no-op.
    pub fn apply(&self, current: &[String]) -> Vec<String> {
        match self {
            ConditionEdit::Add(tag) => {
                let mut next = current.to_vec();
                if !next.contains(tag) {
                    next.push(tag.clone());
                }
                next
            }
            ConditionEdit::Remove(tag) => current.iter().filter(|t| *t != tag).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Patients,
    Switch(String),
    Add(String),
    Threads,
    Open(String),
    New,
    Context,
    Vitals(VitalsUpdate),
    Profile(ProfileUpdate),
    Condition(ConditionEdit),
    Doctor {
        name: String,
        specialty: String,
        phone: String,
    },
    Medication {
        name: String,
        dosage: String,
        frequency: String,
    },
    Files,
    Upload(PathBuf),
    Analyze(PathBuf),
    AnalyzeFile(String),
    Link(String),
    DeleteFile(String),
    Export(PathBuf),
    Import(PathBuf),
    Help,
    Quit,
    /// Bad input, with a message for the user
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Chat(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "patients" => Command::Patients,
            "switch" => required(arg, "/switch <id>", |a| Command::Switch(a.to_string())),
            "add" => required(arg, "/add <name>", |a| Command::Add(a.to_string())),
            "threads" => Command::Threads,
            "open" => required(arg, "/open <thread-id>", |a| Command::Open(a.to_string())),
            "new" => Command::New,
            "context" => Command::Context,
            "vitals" => parse_vitals(arg),
            "profile" => parse_profile(arg),
            "condition" => parse_condition(arg),
            "doctor" => required(arg, "/doctor <name> [| type | phone]", |a| {
                let [name, specialty, phone] = split_fields(a);
                Command::Doctor {
                    name,
                    specialty,
                    phone,
                }
            }),
            "med" => required(arg, "/med <name> [| dosage | frequency]", |a| {
                let [name, dosage, frequency] = split_fields(a);
                Command::Medication {
                    name,
                    dosage,
                    frequency,
                }
            }),
            "files" => Command::Files,
            "upload" => required(arg, "/upload <path>", |a| Command::Upload(PathBuf::from(a))),
            "analyze" => required(arg, "/analyze <path>", |a| Command::Analyze(PathBuf::from(a))),
            "analyze-file" => required(arg, "/analyze-file <file-id>", |a| {
                Command::AnalyzeFile(a.to_string())
            }),
            "link" => required(arg, "/link <file-id>", |a| Command::Link(a.to_string())),
            "delete-file" => required(arg, "/delete-file <file-id>", |a| {
                Command::DeleteFile(a.to_string())
            }),
            "export" => required(arg, "/export <path>", |a| Command::Export(PathBuf::from(a))),
            "import" => required(arg, "/import <path>", |a| Command::Import(PathBuf::from(a))),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(format!("Unknown command /{}. Try /help.", other)),
        }
    }
}

fn required(arg: &str, usage: &str, build: impl FnOnce(&str) -> Command) -> Command {
    if arg.is_empty() {
        Command::Invalid(format!("Usage: {}", usage))
    } else {
        build(arg)
    }
}

/// "a | b | c" into exactly three trimmed fields, missing ones empty
fn split_fields(arg: &str) -> [String; 3] {
    let mut parts = arg.splitn(3, '|').map(|p| p.trim().to_string());
    [
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    ]
}

fn parse_vitals(arg: &str) -> Command {
    let mut update = VitalsUpdate::default();

    // `other=` swallows the rest of the line so it may contain spaces
    let (pairs, other) = match arg.find("other=") {
        Some(pos) => (&arg[..pos], Some(arg[pos + "other=".len()..].trim())),
        None => (arg, None),
    };
    update.other = other.map(str::to_string);

    for pair in pairs.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            return Command::Invalid(format!("Expected key=value, got '{}'", pair));
        };
        let value = Some(value.to_string());
        match key {
            "bp" => update.blood_pressure = value,
            "hr" => update.heart_rate = value,
            "height" => update.height = value,
            "weight" => update.weight = value,
            other => return Command::Invalid(format!("Unknown vital '{}'", other)),
        }
    }

    if update.is_empty() {
        return Command::Invalid("Usage: /vitals bp=.. hr=.. height=.. weight=.. other=..".to_string());
    }
    Command::Vitals(update)
}

const PROFILE_USAGE: &str = "Usage: /profile name=.. dob=.. age=.. insurance=.. member=.. group=..";
const CONDITION_USAGE: &str = "Usage: /condition add|remove <condition>";

// Values may contain spaces: a word without '=' continues the previous value
fn parse_profile(arg: &str) -> Command {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    for word in arg.split_whitespace() {
        if let Some((key, value)) = word.split_once('=') {
            pairs.push((key, value.to_string()));
            continue;
        }
        let Some((_, value)) = pairs.last_mut() else {
            return Command::Invalid(format!("Expected key=value, got '{}'", word));
        };
        value.push(' ');
        value.push_str(word);
    }

    let mut update = ProfileUpdate::default();
    for (key, value) in pairs {
        let value = Some(value.trim().to_string());
        match key {
            "name" => update.name = value,
            "dob" => update.dob = value,
            "age" => update.age = value,
            "insurance" => update.insurance_provider = value,
            "member" => update.member_id = value,
            "group" => update.group_id = value,
            other => return Command::Invalid(format!("Unknown profile field '{}'", other)),
        }
    }

    if update.is_empty() {
        return Command::Invalid(PROFILE_USAGE.to_string());
    }
    Command::Profile(update)
}

fn parse_condition(arg: &str) -> Command {
    let Some((action, tag)) = arg.split_once(char::is_whitespace) else {
        return Command::Invalid(CONDITION_USAGE.to_string());
    };
    let tag = tag.trim().to_string();
    match action {
        "add" => Command::Condition(ConditionEdit::Add(tag)),
        "remove" => Command::Condition(ConditionEdit::Remove(tag)),
        _ => Command::Invalid(CONDITION_USAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  what is metformin "),
            Command::Chat("what is metformin".to_string())
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("/patients"), Command::Patients);
        assert_eq!(Command::parse("/switch 17"), Command::Switch("17".to_string()));
        assert_eq!(Command::parse("/add Sarah Jones"), Command::Add("Sarah Jones".to_string()));
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(
            Command::parse("/upload ./labs.pdf"),
            Command::Upload(PathBuf::from("./labs.pdf"))
        );
    }

    #[test]
    fn test_missing_argument_is_invalid() {
        assert!(matches!(Command::parse("/switch"), Command::Invalid(msg) if msg.contains("/switch <id>")));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(Command::parse("/bogus"), Command::Invalid(_)));
    }

    #[test]
    fn test_doctor_fields() {
        assert_eq!(
            Command::parse("/doctor Dr. Lee | Endocrinology | 555-0100"),
            Command::Doctor {
                name: "Dr. Lee".to_string(),
                specialty: "Endocrinology".to_string(),
                phone: "555-0100".to_string(),
            }
        );
        assert_eq!(
            Command::parse("/med Metformin"),
            Command::Medication {
                name: "Metformin".to_string(),
                dosage: String::new(),
                frequency: String::new(),
            }
        );
    }

    #[test]
    fn test_vitals() {
        let Command::Vitals(update) = Command::parse("/vitals bp=120/80 hr=72 other=SpO2 98%") else {
            panic!("expected vitals");
        };
        assert_eq!(update.blood_pressure.as_deref(), Some("120/80"));
        assert_eq!(update.heart_rate.as_deref(), Some("72"));
        assert_eq!(update.other.as_deref(), Some("SpO2 98%"));

        let current = Vitals {
            weight: "70kg".to_string(),
            heart_rate: "80".to_string(),
            ..Default::default()
        };
        let next = update.apply(&current);
        assert_eq!(next.weight, "70kg");
        assert_eq!(next.heart_rate, "72");
    }

    #[test]
    fn test_bad_vitals() {
        assert!(matches!(Command::parse("/vitals"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/vitals temp=37"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/vitals 120/80"), Command::Invalid(_)));
    }

    #[test]
    fn test_profile_fields_with_spaces() {
        let Command::Profile(update) =
            Command::parse("/profile name=Sarah Jones dob=1980-02-01 insurance=Blue Cross age=45")
        else {
            panic!("expected profile update");
        };
        assert_eq!(update.name.as_deref(), Some("Sarah Jones"));
        assert_eq!(update.dob.as_deref(), Some("1980-02-01"));
        assert_eq!(update.insurance_provider.as_deref(), Some("Blue Cross"));
        assert_eq!(update.age.as_deref(), Some("45"));
        assert!(update.member_id.is_none());
    }

    #[test]
    fn test_profile_patch_keeps_other_insurance_fields() {
        let current = Profile {
            insurance: Insurance {
                provider: "Acme".to_string(),
                member_id: "M-1".to_string(),
                group_id: "G-1".to_string(),
            },
            ..Default::default()
        };
        let update = ProfileUpdate {
            group_id: Some("G-2".to_string()),
            ..Default::default()
        };

        let patch = update.patch(&current);
        let insurance = patch.insurance.unwrap();
        assert_eq!(insurance.provider, "Acme");
        assert_eq!(insurance.member_id, "M-1");
        assert_eq!(insurance.group_id, "G-2");
        assert!(patch.name.is_none());

        let dob_only = ProfileUpdate {
            dob: Some("1980-02-01".to_string()),
            ..Default::default()
        };
        assert!(dob_only.patch(&current).insurance.is_none());
    }

    #[test]
    fn test_bad_profile_update() {
        assert!(matches!(Command::parse("/profile"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/profile Sarah"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/profile height=180"), Command::Invalid(msg) if msg.contains("height")));
    }

    #[test]
    fn test_condition_edits() {
        assert_eq!(
            Command::parse("/condition add Type 2 diabetes"),
            Command::Condition(ConditionEdit::Add("Type 2 diabetes".to_string()))
        );
        assert_eq!(
            Command::parse("/condition remove Asthma"),
            Command::Condition(ConditionEdit::Remove("Asthma".to_string()))
        );
        assert!(matches!(Command::parse("/condition add"), Command::Invalid(_)));
        assert!(matches!(Command::parse("/condition drop Asthma"), Command::Invalid(_)));
    }

    #[test]
    fn test_condition_apply() {
        let current = vec!["Asthma".to_string()];

        let added = ConditionEdit::Add("Hypertension".to_string()).apply(&current);
        assert_eq!(added, vec!["Asthma", "Hypertension"]);

        let duplicate = ConditionEdit::Add("Asthma".to_string()).apply(&current);
        assert_eq!(duplicate, vec!["Asthma"]);

        let removed = ConditionEdit::Remove("Asthma".to_string()).apply(&current);
        assert!(removed.is_empty());
    }
}
