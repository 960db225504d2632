//! Fixed column schema of the survey dataset.
//!
//! The pipeline is not schema-flexible: every name below is a contract,
//! and a missing column is a fatal schema violation at the point of use.

/// Academic course label; also the STEM-membership source and the
/// grouping key for the k-sample comparisons and the risk profile.
pub const COURSE: &str = "Course";
pub const GENDER: &str = "Gender";
pub const AGE: &str = "Age";
pub const CGPA: &str = "CGPA";
pub const SEMESTER_CREDIT_LOAD: &str = "Semester_Credit_Load";

pub const STRESS_LEVEL: &str = "Stress_Level";
pub const DEPRESSION_SCORE: &str = "Depression_Score";
pub const ANXIETY_SCORE: &str = "Anxiety_Score";
pub const FINANCIAL_STRESS: &str = "Financial_Stress";

pub const SLEEP_QUALITY: &str = "Sleep_Quality";
pub const SOCIAL_SUPPORT: &str = "Social_Support";
pub const PHYSICAL_ACTIVITY: &str = "Physical_Activity";
pub const DIET_QUALITY: &str = "Diet_Quality";
pub const COUNSELING_SERVICE_USE: &str = "Counseling_Service_Use";
pub const SUBSTANCE_USE: &str = "Substance_Use";

/// Derived binary STEM indicator, appended once during cleaning.
pub const IS_STEM: &str = "Is_STEM";

/// Derived numeric social-support predictor and its centered form.
pub const SOCIAL_SUPPORT_NUM: &str = "Social_Support_num";
pub const SOCIAL_SUPPORT_CENTERED: &str = "SS_c";

/// Derived numeric gender code (order-of-appearance factorization).
pub const GENDER_NUM: &str = "Gender_num";

/// Courses counted as STEM for the `Is_STEM` derivation.
pub const STEM_COURSES: [&str; 3] = ["Engineering", "Medical", "Computer Science"];

/// Continuous columns subject to the IQR outlier fences.
pub const OUTLIER_COLUMNS: [&str; 3] = [AGE, CGPA, SEMESTER_CREDIT_LOAD];

/// Five-point clinical scores, bounded to [0, 5].
pub const SCORE_COLUMNS: [&str; 4] = [
    STRESS_LEVEL,
    DEPRESSION_SCORE,
    ANXIETY_SCORE,
    FINANCIAL_STRESS,
];

/// Three-level ordinal lifestyle columns recoded to 1/2/3.
pub const ORDINAL_COLUMNS: [&str; 6] = [
    SLEEP_QUALITY,
    SOCIAL_SUPPORT,
    PHYSICAL_ACTIVITY,
    DIET_QUALITY,
    COUNSELING_SERVICE_USE,
    SUBSTANCE_USE,
];

/// Variable subset submitted to the factor-suitability gate and EFA.
pub const FACTOR_VARIABLES: [&str; 4] = [
    STRESS_LEVEL,
    DEPRESSION_SCORE,
    ANXIETY_SCORE,
    FINANCIAL_STRESS,
];
