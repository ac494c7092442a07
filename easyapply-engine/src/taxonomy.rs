//! Static field taxonomy: what each semantic field is called in markup and
//! how to look for it.
//!
//! Descriptors are plain data. The locator interprets the strategy lists in
//! order; nothing here touches a page.
use crate::classifier::PageClassification;
use easyapply_drivers::ControlKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    FileUpload,
    Text,
    Select,
    RadioGroup,
    Checkbox,
    /// A button or link that moves the workflow along.
    Action,
}

impl FieldKind {
    pub fn accepts(self, control: ControlKind) -> bool {
        match self {
            FieldKind::FileUpload => control == ControlKind::FileInput,
            FieldKind::Text => matches!(control, ControlKind::TextInput | ControlKind::TextArea),
            FieldKind::Select => control == ControlKind::Select,
            FieldKind::RadioGroup => control == ControlKind::Radio,
            FieldKind::Checkbox => control == ControlKind::Checkbox,
            FieldKind::Action => matches!(control, ControlKind::Button | ControlKind::Link),
        }
    }
}

/// One way of finding a control, tried in descriptor order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Token match of `id`, `name`, `data-testid`, `autocomplete` or `type`
    /// against canonical aliases.
    Attribute(&'static [&'static str]),
    /// Case-insensitive substring match on the accessible name: `<label>`,
    /// `aria-label`, `placeholder`, or a button's own text.
    Label(&'static [&'static str]),
    /// Substring match on the closest preceding text node.
    NearbyText(&'static [&'static str]),
    /// The `nth` eligible control of the given type.
    Position { control: ControlKind, nth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Attribute,
    Label,
    NearbyText,
    Position,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Attribute(_) => StrategyKind::Attribute,
            Strategy::Label(_) => StrategyKind::Label,
            Strategy::NearbyText(_) => StrategyKind::NearbyText,
            Strategy::Position { .. } => StrategyKind::Position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub strategies: &'static [Strategy],
    /// Controls whose attributes or accessible name mention any of these
    /// words are never matched (e.g. "email address" for the street address).
    pub avoid: &'static [&'static str],
}

pub static RESUME: FieldDescriptor = FieldDescriptor {
    name: "resume",
    kind: FieldKind::FileUpload,
    strategies: &[
        Strategy::Attribute(&["resume", "cv", "resumefile", "resumeupload"]),
        Strategy::Label(&["resume", "cv"]),
        Strategy::NearbyText(&["resume", "cv", "upload"]),
        Strategy::Position {
            control: ControlKind::FileInput,
            nth: 0,
        },
    ],
    avoid: &["cover"],
};

pub static COVER_LETTER: FieldDescriptor = FieldDescriptor {
    name: "cover_letter",
    kind: FieldKind::FileUpload,
    strategies: &[
        Strategy::Attribute(&["coverletter", "cover"]),
        Strategy::Label(&["cover letter"]),
        Strategy::NearbyText(&["cover letter"]),
    ],
    avoid: &[],
};

pub static PHONE: FieldDescriptor = FieldDescriptor {
    name: "phone",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["phone", "phonenumber", "tel", "mobile"]),
        Strategy::Label(&["phone", "mobile number"]),
        Strategy::NearbyText(&["phone"]),
    ],
    avoid: &[],
};

pub static EMAIL: FieldDescriptor = FieldDescriptor {
    name: "email",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["email", "emailaddress"]),
        Strategy::Label(&["email"]),
        Strategy::NearbyText(&["email"]),
    ],
    avoid: &[],
};

pub static ADDRESS: FieldDescriptor = FieldDescriptor {
    name: "address",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["address", "street", "streetaddress", "addressline1"]),
        Strategy::Label(&["street address", "address line", "address"]),
        Strategy::NearbyText(&["address"]),
    ],
    avoid: &["email", "web address"],
};

pub static CITY: FieldDescriptor = FieldDescriptor {
    name: "city",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["city", "locality", "addresslevel2"]),
        Strategy::Label(&["city", "town"]),
        Strategy::NearbyText(&["city"]),
    ],
    avoid: &[],
};

pub static STATE: FieldDescriptor = FieldDescriptor {
    name: "state",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["state", "region", "province", "addresslevel1"]),
        Strategy::Label(&["state", "province"]),
        Strategy::NearbyText(&["state"]),
    ],
    avoid: &["statement"],
};

pub static POSTAL_CODE: FieldDescriptor = FieldDescriptor {
    name: "postal_code",
    kind: FieldKind::Text,
    strategies: &[
        Strategy::Attribute(&["postal", "postalcode", "zip", "zipcode", "postcode"]),
        Strategy::Label(&["postal", "zip", "postcode"]),
        Strategy::NearbyText(&["postal", "zip code"]),
    ],
    avoid: &[],
};

/// Terminal submission control.
pub static SUBMIT: FieldDescriptor = FieldDescriptor {
    name: "submit",
    kind: FieldKind::Action,
    strategies: &[
        Strategy::Attribute(&["submitapplication", "completeapplication"]),
        Strategy::Label(&["submit", "complete application", "finish"]),
    ],
    avoid: &[],
};

pub static CONTINUE: FieldDescriptor = FieldDescriptor {
    name: "continue",
    kind: FieldKind::Action,
    strategies: &[
        Strategy::Attribute(&["continue", "next"]),
        Strategy::Label(&["continue", "next", "review your application", "review"]),
    ],
    avoid: &["back", "previous"],
};

/// Any form submit button, as a last resort.
pub static GENERIC_ADVANCE: FieldDescriptor = FieldDescriptor {
    name: "generic_advance",
    kind: FieldKind::Action,
    strategies: &[Strategy::Attribute(&["submit"])],
    avoid: &["back", "previous", "cancel", "withdraw"],
};

/// Entry button on a job listing.
pub static APPLY_BUTTON: FieldDescriptor = FieldDescriptor {
    name: "apply_button",
    kind: FieldKind::Action,
    strategies: &[
        Strategy::Attribute(&["indeedapplybutton", "applybutton", "apply"]),
        Strategy::Label(&["easy apply", "apply now", "apply"]),
    ],
    avoid: &["applied", "company site"],
};

/// Advance controls in priority order.
pub static ADVANCE_ORDER: [&FieldDescriptor; 3] = [&SUBMIT, &CONTINUE, &GENERIC_ADVANCE];

/// A descriptor as used on one step kind.
#[derive(Debug, Clone, Copy)]
pub struct StepField {
    pub descriptor: &'static FieldDescriptor,
    pub required: bool,
}

const fn required(descriptor: &'static FieldDescriptor) -> StepField {
    StepField {
        descriptor,
        required: true,
    }
}

const fn optional(descriptor: &'static FieldDescriptor) -> StepField {
    StepField {
        descriptor,
        required: false,
    }
}

static RESUME_STEP: [StepField; 2] = [required(&RESUME), optional(&COVER_LETTER)];

static CONTACT_STEP: [StepField; 6] = [
    optional(&PHONE),
    optional(&EMAIL),
    optional(&ADDRESS),
    optional(&CITY),
    optional(&STATE),
    optional(&POSTAL_CODE),
];

static REVIEW_STEP: [StepField; 1] = [optional(&RESUME)];

/// Descriptor-driven fields for a step kind. Screening questions are driven
/// by the page's question blocks instead.
pub fn plan(classification: PageClassification) -> &'static [StepField] {
    match classification {
        PageClassification::ResumeUpload => &RESUME_STEP,
        PageClassification::ContactInfo => &CONTACT_STEP,
        PageClassification::Review => &REVIEW_STEP,
        PageClassification::ScreeningQuestions
        | PageClassification::Submission
        | PageClassification::Unknown => &[],
    }
}

/// Contact-like descriptors, used by the classifier.
pub static CONTACT_FIELDS: [&FieldDescriptor; 4] = [&PHONE, &ADDRESS, &CITY, &POSTAL_CODE];
