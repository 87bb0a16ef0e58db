//! Documentation content for the rules CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Operators,
    Identifiers,
    Modifiers,
    Macros,
    Rules,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Some(Self::Syntax),
            "operators" | "ops" => Some(Self::Operators),
            "identifiers" | "fields" | "request" => Some(Self::Identifiers),
            "modifiers" | "modifier" => Some(Self::Modifiers),
            "macros" | "macro" | "datetime" => Some(Self::Macros),
            "rules" | "rule" | "access" => Some(Self::Rules),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"RECORD FILTER DOCUMENTATION

Filters are boolean expressions over a record's fields and the current
request. The same language drives client list filters and the access rules
configured on each collection.

DOCUMENTATION CATEGORIES

  syntax            Literals, comparisons, grouping, comments
  operators         Comparison operators, any-of forms, && and ||
  identifiers       Field paths, relations, @request.*, @collection.*
  modifiers         :isset, :length, :lower, :each
  macros            @now, @todayStart and the other datetime macros
  rules             Locked, public and conditional rules; status codes

QUICK REFERENCE

  status = "published"          Comparison
  a = 1 && (b = 2 || c = 3)     Grouping; && binds tighter than ||
  tags.name ?= "rust"           Any element matches
  @request.auth.id != ""        Caller is authenticated
  created >= @todayStart        Datetime macro
  // comment                    Ignored to end of line

Run 'rules doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Syntax) => Ok(SYNTAX_DOC),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC),
        Some(DocCategory::Identifiers) => Ok(IDENTIFIERS_DOC),
        Some(DocCategory::Modifiers) => Ok(MODIFIERS_DOC),
        Some(DocCategory::Macros) => Ok(MACROS_DOC),
        Some(DocCategory::Rules) => Ok(RULES_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const SYNTAX_DOC: &str = r#"SYNTAX - Literals, Comparisons, Grouping

LITERALS
  "text" or 'text'      Strings; escapes \" \' \\ only
  42  -7  +3            Integers
  4.5  -0.25            Decimals
  true  false           Booleans
  null                  Null

COMPARISONS
  operand OP operand
    Every condition is exactly one comparison. Operands are literals or
    identifiers; comparisons do not chain.

    Example:
      views > 50
      status != "draft"

    Constraints:
      - "a = b = c" is a parse error
      - A bare operand without an operator is a parse error

GROUPING
  ( expression )
    Parentheses group whole conditions. A group cannot be compared.

    Example:
      (status = "published" || featured = true) && views > 50

COMMENTS
  // text
    Runs to the end of the line and is ignored.

EMPTY FILTERS
  An empty or comment-only filter matches everything.

LIMITS
  Filters longer than 3500 characters are rejected.
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Comparison and Logical

COMPARISON OPERATORS
  =     Equal (case-sensitive for strings)
  !=    Not equal
  >     Greater than
  >=    Greater than or equal
  <     Less than
  <=    Less than or equal
  ~     Contains (case-insensitive substring)
  !~    Does not contain

  Coercion:
    - Numbers compare numerically, also against numeric strings
    - Two datetime strings compare as instants
    - Everything else compares as text; null is ""

  Examples:
    title ~ "java"            matches "Learning JavaScript"
    price <= "19.99"          numeric comparison

ANY-OF OPERATORS
  ?=  ?!=  ?>  ?>=  ?<  ?<=  ?~  ?!~
    Succeed when at least one element of the left operand satisfies the
    base operator. A single value counts as a one-element list.

    Example:
      tags.id ?= "T1"

    Constraints:
      - Plain operators on a multi-valued operand are an error
      - @collection references compare existentially with either form

LOGICAL OPERATORS
  &&    AND, short-circuit
  ||    OR, short-circuit

  Precedence: && binds tighter than ||, both associate left.
"#;

const IDENTIFIERS_DOC: &str = r#"IDENTIFIERS - Fields, Relations, Request Data

RECORD FIELDS
  status, author.name, meta.lang
    Paths walk the record's fields, expanded relations and JSON objects.
    A path may take at most 6 relation hops.

    Constraints:
      - Unknown fields and unexpanded relations never match
      - Multi relations yield every related value (use ?= etc.)

BACK-RELATIONS
  comments_via_post.text
    Records of "comments" whose "post" field points at this record.
    Always multi-valued.

REQUEST DATA
  @request.context        default, oauth2, otp, password, realtime,
                          protectedFile
  @request.method         GET, POST, ...
  @request.headers.x_token
                          Header names lower-cased, "-" becomes "_"
  @request.query.page     Query parameters
  @request.body.title     Submitted body fields
  @request.auth.id        The authenticated record; every field is null
                          for anonymous callers

    Example:
      @request.auth.id != "" && author = @request.auth.id

JOINS
  @collection.<name>.<field>
    Values of <field> across every record of another collection.

    Example:
      @collection.members.user ?= @request.auth.id
"#;

const MODIFIERS_DOC: &str = r#"MODIFIERS - Suffixes on Identifiers

  :isset
    Whether the client sent the key at all. Only on @request.body,
    @request.query and @request.headers fields.

    Example:
      @request.body.role:isset = false

  :length
    Number of elements of a list, characters of a string, 0 for null.

    Example:
      tags:length > 2

  :lower
    Lower-cased text form of the value.

    Example:
      title:lower = "draft"

  :each
    Every element must satisfy the comparison; an empty list never does.

    Example:
      @request.body.tags:each ~ "pub"

    Constraints:
      - Left operand only
      - Not with ?-operators
      - Any other modifier name is an error
"#;

const MACROS_DOC: &str = r#"MACROS - Datetime Values

Resolved in UTC every time a filter is evaluated.

DATETIMES (text "YYYY-MM-DD HH:MM:SS.mmmZ")
  @now                  Current instant
  @yesterday            24 hours ago
  @tomorrow             24 hours ahead
  @todayStart           00:00:00.000 today
  @todayEnd             23:59:59.999 today
  @monthStart           First instant of the month
  @monthEnd             Last instant of the month
  @yearStart            First instant of the year
  @yearEnd              Last instant of the year

CALENDAR PARTS (integers)
  @second  @minute  @hour  @day  @month  @year
  @weekday              0 = Sunday .. 6 = Saturday

  Example:
    created >= @todayStart && @weekday != 0
"#;

const RULES_DOC: &str = r#"RULES - Collection Access Control

Each collection has listRule, viewRule, createRule, updateRule and
deleteRule; auth collections add manageRule and authRule.

RULE VALUES
  null          Locked: superusers only
  ""            Public: everyone
  "<filter>"    Callers for whom the filter holds

  Superusers bypass every rule.

OUTCOMES WHEN A RULE FAILS
  list          200 with no items
  view          404
  update        404
  delete        404
  create        400
  auth          400
  manage        403
  locked rule   403

LIST FILTERS
  The list rule and the client's filter are combined with &&; only rows
  matching both are returned.

Evaluation errors always deny.
"#;
