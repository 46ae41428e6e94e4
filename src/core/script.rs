//! PowerShell command builder
//!
//! Renders the script text for every supported operation. Generated
//! scripts follow one frame:
//!
//! - `$ErrorActionPreference = 'Stop'` up front;
//! - action scripts wrap the body in try/catch and print a
//!   `SUCCESS:`/`ERROR:` sentinel on every exit path (exit codes are not
//!   trusted across `Invoke-Command`/remote paths);
//! - query scripts end in `ConvertTo-Json -Compress`.
//!
//! Free-form values enter scripts only through [`quote_literal`]
//! (single-quoted, with embedded quotes doubled — single-quoted
//! PowerShell strings expand nothing, so the encoding is complete) or
//! [`escape_like_pattern`] for `-like` matching. Secrets never enter
//! script text at all: they ride the stdin payload and are referenced as
//! `$payload.<field>`.
//!
//! Scripts assume the executor bootstrap has bound `$payload`, `$cred`
//! (a PSCredential or `$null` in Kerberos mode) and `$adArgs` (the
//! `-Server`/`-Credential` splat shared by every AD cmdlet call).

use crate::utils::AdError;
use std::fmt::Write as _;

/// Scope for a new group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupScope {
    #[default]
    Global,
    DomainLocal,
    Universal,
}

impl GroupScope {
    fn as_ps(self) -> &'static str {
        match self {
            GroupScope::Global => "Global",
            GroupScope::DomainLocal => "DomainLocal",
            GroupScope::Universal => "Universal",
        }
    }
}

/// Category for a new group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupCategory {
    #[default]
    Security,
    Distribution,
}

impl GroupCategory {
    fn as_ps(self) -> &'static str {
        match self {
            GroupCategory::Security => "Security",
            GroupCategory::Distribution => "Distribution",
        }
    }
}

/// Request to create a user account
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub sam_account_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    /// Target OU distinguished name; falls back to the session default
    pub ou: Option<String>,
    /// Groups to join, best-effort after creation
    pub groups: Vec<String>,
    pub enabled: bool,
    /// Set the initial password from the payload's `initial_password`
    pub set_initial_password: bool,
    pub change_password_at_logon: bool,
}

/// Request to create a computer account
#[derive(Debug, Clone, Default)]
pub struct NewComputer {
    pub name: String,
    pub description: Option<String>,
    pub ou: Option<String>,
    pub groups: Vec<String>,
}

/// Request to create a group
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub scope: GroupScope,
    pub category: GroupCategory,
    pub ou: Option<String>,
}

// ============================================================================
// Escaping
// ============================================================================

/// Encode a free-form value as a single-quoted PowerShell literal.
///
/// Single-quoted strings have exactly one escape: a doubled quote.
/// No variable expansion, no subexpressions, no backtick processing.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape user input for safe embedding in PowerShell `-like` patterns.
///
/// Backtick must be escaped first (it is the escape character); quotes
/// are doubled; wildcard and expression metacharacters are backticked so
/// filter input cannot break out of the pattern.
pub fn escape_like_pattern(value: &str) -> String {
    value
        .replace('`', "``")
        .replace('\'', "''")
        .replace('[', "`[")
        .replace(']', "`]")
        .replace('*', "`*")
        .replace('?', "`?")
        .replace('{', "`{")
        .replace('}', "`}")
        .replace('$', "`$")
        .replace('(', "`(")
        .replace(')', "`)")
        .replace('|', "`|")
}

fn ps_bool(value: bool) -> &'static str {
    if value {
        "$true"
    } else {
        "$false"
    }
}

// ============================================================================
// Frames
// ============================================================================

fn action_frame(body: &str) -> String {
    let mut script = String::from("$ErrorActionPreference = 'Stop'\ntry {\n");
    for line in body.lines() {
        if line.is_empty() {
            script.push('\n');
        } else {
            let _ = writeln!(script, "    {}", line);
        }
    }
    script.push_str("} catch {\n    Write-Output ('ERROR: ' + $_.Exception.Message)\n    exit 1\n}\n");
    script
}

fn query_frame(body: &str) -> String {
    format!("$ErrorActionPreference = 'Stop'\n{}\n", body.trim_end())
}

/// Best-effort group membership block: a failed membership must not fail
/// the creation, so each addition gets its own try/catch and reports a
/// `STEP:` outcome line.
fn membership_block(member: &str, groups: &[String]) -> String {
    let mut block = String::new();
    for group in groups {
        let _ = write!(
            block,
            "try {{\n    Add-ADGroupMember -Identity {group} -Members {member} @adArgs\n    Write-Output 'STEP:ok group:{label}'\n}} catch {{\n    Write-Output ('STEP:fail group:{label} ' + $_.Exception.Message)\n}}\n",
            group = quote_literal(group),
            member = quote_literal(member),
            // Step names are single tokens; spaces would split the
            // name from the detail when the outcome line is parsed.
            label = group.replace('\'', "").replace(' ', "_"),
        );
    }
    block
}

// ============================================================================
// Create operations
// ============================================================================

/// Build the create-user script.
///
/// Optional attributes emit an assignment line only when supplied, so an
/// absent value never overwrites an existing attribute with an empty one.
pub fn create_user(user: &NewUser, default_ou: Option<&str>) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "$params = @{{\n    Name = {}\n    SamAccountName = {}\n    Enabled = {}\n}}",
        quote_literal(&user.name),
        quote_literal(&user.sam_account_name),
        ps_bool(user.enabled),
    );

    let optional = [
        ("DisplayName", user.display_name.as_deref()),
        ("Description", user.description.as_deref()),
        ("Title", user.title.as_deref()),
        ("Department", user.department.as_deref()),
        ("EmailAddress", user.email.as_deref()),
        ("Path", user.ou.as_deref().or(default_ou)),
    ];
    for (attribute, value) in optional {
        if let Some(value) = value {
            let _ = writeln!(body, "$params['{}'] = {}", attribute, quote_literal(value));
        }
    }

    if user.set_initial_password {
        body.push_str(
            "$params['AccountPassword'] = ConvertTo-SecureString -AsPlainText -Force ([string]$payload.initial_password)\n",
        );
        if user.change_password_at_logon {
            body.push_str("$params['ChangePasswordAtLogon'] = $true\n");
        }
    }

    body.push_str("New-ADUser @params @adArgs\n");
    body.push_str(&membership_block(&user.sam_account_name, &user.groups));
    let _ = writeln!(
        body,
        "Write-Output 'SUCCESS: User {} created successfully'",
        user.name.replace('\'', "")
    );

    action_frame(&body)
}

/// Build the create-computer script.
pub fn create_computer(computer: &NewComputer, default_ou: Option<&str>) -> String {
    let sam = format!("{}$", computer.name.trim_end_matches('$'));

    let mut body = String::new();
    let _ = writeln!(
        body,
        "$params = @{{\n    Name = {}\n    SamAccountName = {}\n    Enabled = $true\n}}",
        quote_literal(&computer.name),
        quote_literal(&sam),
    );
    if let Some(description) = computer.description.as_deref() {
        let _ = writeln!(body, "$params['Description'] = {}", quote_literal(description));
    }
    if let Some(path) = computer.ou.as_deref().or(default_ou) {
        let _ = writeln!(body, "$params['Path'] = {}", quote_literal(path));
    }
    body.push_str("New-ADComputer @params @adArgs\n");
    body.push_str(&membership_block(&sam, &computer.groups));
    let _ = writeln!(
        body,
        "Write-Output 'SUCCESS: Computer {} created successfully'",
        computer.name.replace('\'', "")
    );

    action_frame(&body)
}

/// Build the create-group script.
pub fn create_group(group: &NewGroup, default_ou: Option<&str>) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "$params = @{{\n    Name = {}\n    GroupScope = '{}'\n    GroupCategory = '{}'\n}}",
        quote_literal(&group.name),
        group.scope.as_ps(),
        group.category.as_ps(),
    );
    if let Some(description) = group.description.as_deref() {
        let _ = writeln!(body, "$params['Description'] = {}", quote_literal(description));
    }
    if let Some(path) = group.ou.as_deref().or(default_ou) {
        let _ = writeln!(body, "$params['Path'] = {}", quote_literal(path));
    }
    body.push_str("New-ADGroup @params @adArgs\n");
    let _ = writeln!(
        body,
        "Write-Output 'SUCCESS: Group {} created successfully'",
        group.name.replace('\'', "")
    );

    action_frame(&body)
}

// ============================================================================
// Update operations
// ============================================================================

fn update_field_with(cmdlet: &str, identity: &str, field: &str, value: &str) -> Result<String, AdError> {
    let body = match field.to_ascii_lowercase().as_str() {
        // Allow-listed fields map to dedicated cmdlet parameters
        "description" => format!(
            "{} -Identity {} -Description {} @adArgs",
            cmdlet,
            quote_literal(identity),
            quote_literal(value)
        ),
        "title" => format!(
            "{} -Identity {} -Title {} @adArgs",
            cmdlet,
            quote_literal(identity),
            quote_literal(value)
        ),
        "department" => format!(
            "{} -Identity {} -Department {} @adArgs",
            cmdlet,
            quote_literal(identity),
            quote_literal(value)
        ),
        // Anything else goes through a generic -Replace hashtable; the
        // attribute name becomes a hashtable key so it must be a plain
        // LDAP display name, not an expression.
        _ => {
            if !is_attribute_name(field) {
                return Err(AdError::Validation(format!(
                    "Unsupported field name for update: {}",
                    field
                )));
            }
            format!(
                "{} -Identity {} -Replace @{{ '{}' = {} }} @adArgs",
                cmdlet,
                quote_literal(identity),
                field,
                quote_literal(value)
            )
        }
    };

    let sentinel = format!(
        "Write-Output 'SUCCESS: Updated {} on {}'",
        field.replace('\'', ""),
        identity.replace('\'', "")
    );
    Ok(action_frame(&format!("{}\n{}\n", body, sentinel)))
}

/// Build the single-field user update script.
pub fn update_user_field(identity: &str, field: &str, value: &str) -> Result<String, AdError> {
    update_field_with("Set-ADUser", identity, field, value)
}

/// Build the single-field computer update script.
pub fn update_computer_field(identity: &str, field: &str, value: &str) -> Result<String, AdError> {
    update_field_with("Set-ADComputer", identity, field, value)
}

fn is_attribute_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && field.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

// ============================================================================
// Delete operations
// ============================================================================

fn delete_with(get_cmdlet: &str, remove_cmdlet: &str, kind: &str, identity: &str) -> String {
    let quoted = quote_literal(identity);
    let label = identity.replace('\'', "");
    // Existence check, delete, post-delete re-check: three round-trips,
    // each able to fail on its own.
    let body = format!(
        "try {{\n    $null = {get} -Identity {quoted} @adArgs\n}} catch {{\n    Write-Output 'ERROR: {kind} {label} not found'\n    exit 1\n}}\n{remove} -Identity {quoted} -Confirm:$false @adArgs\n$stillPresent = $true\ntry {{\n    $null = {get} -Identity {quoted} @adArgs\n}} catch {{\n    $stillPresent = $false\n}}\nif ($stillPresent) {{\n    Write-Output 'ERROR: {kind} {label} still present after deletion'\n    exit 1\n}}\nWrite-Output 'SUCCESS: {kind} {label} deleted'\n",
        get = get_cmdlet,
        remove = remove_cmdlet,
        quoted = quoted,
        kind = kind,
        label = label,
    );
    action_frame(&body)
}

/// Build the delete-user script (check, delete, re-check).
pub fn delete_user(identity: &str) -> String {
    delete_with("Get-ADUser", "Remove-ADUser", "User", identity)
}

/// Build the delete-computer script (check, delete, re-check).
pub fn delete_computer(identity: &str) -> String {
    delete_with("Get-ADComputer", "Remove-ADComputer", "Computer", identity)
}

/// Build the delete-group script (check, delete, re-check).
pub fn delete_group(identity: &str) -> String {
    delete_with("Get-ADGroup", "Remove-ADGroup", "Group", identity)
}

// ============================================================================
// Toggle / reset operations
// ============================================================================

/// Build the enable/disable account script.
pub fn set_user_enabled(identity: &str, enabled: bool) -> String {
    let cmdlet = if enabled {
        "Enable-ADAccount"
    } else {
        "Disable-ADAccount"
    };
    let verb = if enabled { "enabled" } else { "disabled" };
    action_frame(&format!(
        "{} -Identity {} @adArgs\nWrite-Output 'SUCCESS: Account {} {}'\n",
        cmdlet,
        quote_literal(identity),
        identity.replace('\'', ""),
        verb,
    ))
}

/// Build the password reset script.
///
/// Coordinates `PasswordNeverExpires`: the flag is read, cleared for the
/// reset, and restored afterwards, each step best-effort with its own
/// `STEP:` outcome line. The new password arrives via the payload's
/// `new_password` field, never in script text.
pub fn reset_password(identity: &str, force_change: bool) -> String {
    let quoted = quote_literal(identity);
    let label = identity.replace('\'', "");

    let mut body = String::new();
    let _ = writeln!(
        body,
        "$account = Get-ADUser -Identity {} -Properties PasswordNeverExpires @adArgs",
        quoted
    );
    body.push_str("$hadNeverExpires = [bool]$account.PasswordNeverExpires\n");
    let _ = write!(
        body,
        "if ($hadNeverExpires) {{\n    try {{\n        Set-ADUser -Identity {quoted} -PasswordNeverExpires $false @adArgs\n        Write-Output 'STEP:ok clear-password-never-expires'\n    }} catch {{\n        Write-Output ('STEP:fail clear-password-never-expires ' + $_.Exception.Message)\n    }}\n}}\n",
        quoted = quoted,
    );
    body.push_str(
        "$newPassword = ConvertTo-SecureString -AsPlainText -Force ([string]$payload.new_password)\n",
    );
    let _ = writeln!(
        body,
        "Set-ADAccountPassword -Identity {} -Reset -NewPassword $newPassword @adArgs",
        quoted
    );
    if force_change {
        let _ = write!(
            body,
            "try {{\n    Set-ADUser -Identity {quoted} -ChangePasswordAtLogon $true @adArgs\n    Write-Output 'STEP:ok change-at-next-logon'\n}} catch {{\n    Write-Output ('STEP:fail change-at-next-logon ' + $_.Exception.Message)\n}}\n",
            quoted = quoted,
        );
    }
    let _ = write!(
        body,
        "if ($hadNeverExpires) {{\n    try {{\n        Set-ADUser -Identity {quoted} -PasswordNeverExpires $true @adArgs\n        Write-Output 'STEP:ok restore-password-never-expires'\n    }} catch {{\n        Write-Output ('STEP:fail restore-password-never-expires ' + $_.Exception.Message)\n    }}\n}}\n",
        quoted = quoted,
    );
    let _ = writeln!(body, "Write-Output 'SUCCESS: Password reset for {}'", label);

    action_frame(&body)
}

// ============================================================================
// Group membership
// ============================================================================

/// Build the add-member script.
pub fn add_group_member(group: &str, member: &str) -> String {
    action_frame(&format!(
        "Add-ADGroupMember -Identity {} -Members {} @adArgs\nWrite-Output 'SUCCESS: Added {} to {}'\n",
        quote_literal(group),
        quote_literal(member),
        member.replace('\'', ""),
        group.replace('\'', ""),
    ))
}

/// Build the remove-member script.
pub fn remove_group_member(group: &str, member: &str) -> String {
    action_frame(&format!(
        "Remove-ADGroupMember -Identity {} -Members {} -Confirm:$false @adArgs\nWrite-Output 'SUCCESS: Removed {} from {}'\n",
        quote_literal(group),
        quote_literal(member),
        member.replace('\'', ""),
        group.replace('\'', ""),
    ))
}

// ============================================================================
// Queries
// ============================================================================

fn name_filter_clause(filter: Option<&str>) -> String {
    match filter {
        Some(pattern) => format!(
            " | Where-Object {{ $_.Name -like '*{}*' }}",
            escape_like_pattern(pattern)
        ),
        None => String::new(),
    }
}

const USER_PROJECTION: &str = "Select-Object @{n='name';e={$_.Name}}, @{n='sam_account_name';e={$_.SamAccountName}}, @{n='distinguished_name';e={$_.DistinguishedName}}, @{n='description';e={$_.Description}}, @{n='title';e={$_.Title}}, @{n='department';e={$_.Department}}, @{n='email';e={$_.EmailAddress}}, @{n='enabled';e={[bool]$_.Enabled}}, @{n='locked_out';e={[bool]$_.LockedOut}}, @{n='member_of';e={@($_.MemberOf)}}, @{n='when_created';e={if ($_.whenCreated) { $_.whenCreated.ToString('yyyy-MM-ddTHH:mm:ssZ') } else { $null }}}, @{n='last_logon';e={if ($_.LastLogonDate) { $_.LastLogonDate.ToString('yyyy-MM-ddTHH:mm:ssZ') } else { $null }}}";

const USER_PROPERTIES: &str =
    "Description,Title,Department,EmailAddress,MemberOf,whenCreated,LastLogonDate,LockedOut";

/// Build the list-users query.
pub fn list_users(filter: Option<&str>) -> String {
    query_frame(&format!(
        "@(Get-ADUser -Filter * -Properties {} @adArgs{} | {}) | ConvertTo-Json -Compress -Depth 4",
        USER_PROPERTIES,
        name_filter_clause(filter),
        USER_PROJECTION,
    ))
}

/// Build the single-user query.
pub fn get_user(identity: &str) -> String {
    query_frame(&format!(
        "Get-ADUser -Identity {} -Properties {} @adArgs | {} | ConvertTo-Json -Compress -Depth 4",
        quote_literal(identity),
        USER_PROPERTIES,
        USER_PROJECTION,
    ))
}

const COMPUTER_PROJECTION: &str = "Select-Object @{n='name';e={$_.Name}}, @{n='sam_account_name';e={$_.SamAccountName}}, @{n='distinguished_name';e={$_.DistinguishedName}}, @{n='description';e={$_.Description}}, @{n='dns_host_name';e={$_.DNSHostName}}, @{n='operating_system';e={$_.OperatingSystem}}, @{n='enabled';e={[bool]$_.Enabled}}, @{n='when_created';e={if ($_.whenCreated) { $_.whenCreated.ToString('yyyy-MM-ddTHH:mm:ssZ') } else { $null }}}, @{n='last_logon';e={if ($_.LastLogonDate) { $_.LastLogonDate.ToString('yyyy-MM-ddTHH:mm:ssZ') } else { $null }}}";

const COMPUTER_PROPERTIES: &str =
    "Description,DNSHostName,OperatingSystem,whenCreated,LastLogonDate";

/// Build the list-computers query.
pub fn list_computers(filter: Option<&str>) -> String {
    query_frame(&format!(
        "@(Get-ADComputer -Filter * -Properties {} @adArgs{} | {}) | ConvertTo-Json -Compress -Depth 4",
        COMPUTER_PROPERTIES,
        name_filter_clause(filter),
        COMPUTER_PROJECTION,
    ))
}

/// Build the single-computer query.
pub fn get_computer(identity: &str) -> String {
    query_frame(&format!(
        "Get-ADComputer -Identity {} -Properties {} @adArgs | {} | ConvertTo-Json -Compress -Depth 4",
        quote_literal(identity),
        COMPUTER_PROPERTIES,
        COMPUTER_PROJECTION,
    ))
}

/// Build the list-groups query.
pub fn list_groups(filter: Option<&str>) -> String {
    query_frame(&format!(
        "@(Get-ADGroup -Filter * -Properties Description,Members @adArgs{} | Select-Object @{{n='name';e={{$_.Name}}}}, @{{n='distinguished_name';e={{$_.DistinguishedName}}}}, @{{n='description';e={{$_.Description}}}}, @{{n='category';e={{[string]$_.GroupCategory}}}}, @{{n='scope';e={{[string]$_.GroupScope}}}}, @{{n='member_count';e={{@($_.Members).Count}}}}) | ConvertTo-Json -Compress -Depth 4",
        name_filter_clause(filter),
    ))
}

/// Build the group-members query.
pub fn group_members(group: &str) -> String {
    query_frame(&format!(
        "@(Get-ADGroupMember -Identity {} @adArgs | Select-Object @{{n='name';e={{$_.name}}}}, @{{n='sam_account_name';e={{$_.SamAccountName}}}}, @{{n='object_class';e={{$_.objectClass}}}}) | ConvertTo-Json -Compress",
        quote_literal(group),
    ))
}

/// Build the list-OUs query.
pub fn list_organizational_units() -> String {
    query_frame(
        "@(Get-ADOrganizationalUnit -Filter * @adArgs | Select-Object @{n='name';e={$_.Name}}, @{n='distinguished_name';e={$_.DistinguishedName}}) | ConvertTo-Json -Compress",
    )
}

/// Build the domain-info query.
pub fn domain_info() -> String {
    query_frame(
        "Get-ADDomain @adArgs | Select-Object @{n='name';e={$_.Name}}, @{n='dns_root';e={$_.DNSRoot}}, @{n='netbios_name';e={$_.NetBIOSName}}, @{n='domain_mode';e={[string]$_.DomainMode}}, @{n='pdc_emulator';e={$_.PDCEmulator}} | ConvertTo-Json -Compress",
    )
}

/// Build a count query; prints a bare number.
pub fn count_objects(get_cmdlet: &str) -> String {
    query_frame(&format!("@({} -Filter * @adArgs).Count", get_cmdlet))
}

// ============================================================================
// Remote machine scripts
// ============================================================================

/// Splat for remote execution against one target machine: the credential
/// rides along only when the session binds with explicit credentials.
fn invoke_args(target: &str) -> String {
    format!(
        "$icArgs = @{{ ComputerName = {} }}\nif ($cred) {{ $icArgs.Credential = $cred }}\n",
        quote_literal(target)
    )
}

/// Build the machine OS summary query (Win32_OperatingSystem).
pub fn system_summary(target: &str) -> String {
    query_frame(&format!(
        "{}Invoke-Command @icArgs -ScriptBlock {{\n    $os = Get-CimInstance -ClassName Win32_OperatingSystem\n    [pscustomobject]@{{\n        hostname = $env:COMPUTERNAME\n        os_version = $os.Caption\n        build_number = [string]$os.BuildNumber\n        last_boot = $os.LastBootUpTime.ToString('yyyy-MM-ddTHH:mm:ssZ')\n        free_memory_mb = [math]::Round($os.FreePhysicalMemory / 1024, 2)\n        total_memory_mb = [math]::Round($os.TotalVisibleMemorySize / 1024, 2)\n    }}\n}} | ConvertTo-Json -Compress",
        invoke_args(target),
    ))
}

/// Build the fixed-disk query (Win32_LogicalDisk, DriveType 3).
pub fn list_disks(target: &str) -> String {
    query_frame(&format!(
        "{}@(Invoke-Command @icArgs -ScriptBlock {{\n    Get-CimInstance -ClassName Win32_LogicalDisk | Where-Object {{ $_.DriveType -eq 3 -and $_.Size -gt 0 }} | ForEach-Object {{\n        [pscustomobject]@{{\n            drive = $_.DeviceID\n            total_gb = [math]::Round($_.Size / 1GB, 2)\n            free_gb = [math]::Round($_.FreeSpace / 1GB, 2)\n        }}\n    }}\n}}) | ConvertTo-Json -Compress",
        invoke_args(target),
    ))
}

/// Build the user-profile listing query (Win32_UserProfile).
pub fn list_profiles(target: &str) -> String {
    query_frame(&format!(
        "{}@(Invoke-Command @icArgs -ScriptBlock {{\n    Get-CimInstance -ClassName Win32_UserProfile | Where-Object {{ -not $_.Special }} | ForEach-Object {{\n        [pscustomobject]@{{\n            sid = $_.SID\n            local_path = $_.LocalPath\n            loaded = [bool]$_.Loaded\n            last_use_time = if ($_.LastUseTime) {{ $_.LastUseTime.ToString('yyyy-MM-ddTHH:mm:ssZ') }} else {{ $null }}\n        }}\n    }}\n}}) | ConvertTo-Json -Compress",
        invoke_args(target),
    ))
}

/// Build the profile deletion script.
pub fn delete_profile(target: &str, sid: &str) -> String {
    let body = format!(
        "{}Invoke-Command @icArgs -ScriptBlock {{\n    $profile = Get-CimInstance -ClassName Win32_UserProfile | Where-Object {{ $_.SID -eq {sid} }}\n    if (-not $profile) {{ throw 'Profile not found' }}\n    if ($profile.Loaded) {{ throw 'Profile is currently loaded' }}\n    $profile | Remove-CimInstance\n}}\nWrite-Output 'SUCCESS: Profile {label} removed'\n",
        invoke_args(target),
        sid = quote_literal(sid),
        label = sid.replace('\'', ""),
    );
    action_frame(&body)
}

/// Build the service status query.
pub fn get_service(target: &str, name: &str) -> String {
    query_frame(&format!(
        "{}Invoke-Command @icArgs -ScriptBlock {{\n    $svc = Get-Service -Name {name}\n    [pscustomobject]@{{\n        name = $svc.Name\n        display_name = $svc.DisplayName\n        status = $svc.Status.ToString()\n        startup_type = $svc.StartType.ToString()\n    }}\n}} | ConvertTo-Json -Compress",
        invoke_args(target),
        name = quote_literal(name),
    ))
}

/// Build the reboot script. Fire-and-forget: no confirmation loop beyond
/// the immediate response text.
pub fn reboot_computer(target: &str) -> String {
    let body = format!(
        "$restartArgs = @{{ ComputerName = {} ; Force = $true }}\nif ($cred) {{ $restartArgs.Credential = $cred }}\nRestart-Computer @restartArgs\nWrite-Output 'SUCCESS: Reboot issued for {}'\n",
        quote_literal(target),
        target.replace('\'', ""),
    );
    action_frame(&body)
}

/// Build the printer installation script (60 s class).
pub fn install_printer(target: &str, connection: &str) -> String {
    let body = format!(
        "{}Invoke-Command @icArgs -ScriptBlock {{\n    Add-Printer -ConnectionName {conn}\n}}\nWrite-Output 'SUCCESS: Printer {label} installed'\n",
        invoke_args(target),
        conn = quote_literal(connection),
        label = connection.replace('\'', ""),
    );
    action_frame(&body)
}

/// Build the connectivity test (Test-WSMan); prints a bare `OK`.
pub fn test_connectivity(target: &str) -> String {
    action_frame(&format!(
        "Test-WSMan -ComputerName {} -ErrorAction Stop | Out-Null\nWrite-Output 'OK'\n",
        quote_literal(target),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Escaping ====================

    #[test]
    fn quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_literal("it's'"), "'it''s'''");
    }

    #[test]
    fn quote_literal_leaves_expansion_chars_inert() {
        // Inside single quotes these have no meaning; they must pass
        // through unchanged rather than be mangled.
        assert_eq!(quote_literal("$env:TEMP `x"), "'$env:TEMP `x'");
    }

    #[test]
    fn escape_like_pattern_wildcards() {
        assert_eq!(escape_like_pattern("test*"), "test`*");
        assert_eq!(escape_like_pattern("test?"), "test`?");
        assert_eq!(escape_like_pattern("[0-9]"), "`[0-9`]");
    }

    #[test]
    fn escape_like_pattern_neutralizes_injection() {
        let injection = "' } Write-Host 'PWNED' | Where-Object { $_.Name -like '*";
        let escaped = escape_like_pattern(injection);
        assert!(!escaped.contains("' }"));
        assert!(escaped.contains("''"));
        assert!(escaped.contains("`|"));
        assert!(escaped.contains("`{"));
    }

    // ==================== Create scripts ====================

    #[test]
    fn create_computer_omits_absent_description() {
        let script = create_computer(
            &NewComputer {
                name: "WS-01".to_string(),
                ..Default::default()
            },
            None,
        );
        assert!(!script.contains("Description"));
        assert!(script.contains("New-ADComputer @params @adArgs"));
        assert!(script.contains("SUCCESS: Computer WS-01 created successfully"));
    }

    #[test]
    fn create_computer_includes_supplied_description() {
        let script = create_computer(
            &NewComputer {
                name: "WS-01".to_string(),
                description: Some("Test PC".to_string()),
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("$params['Description'] = 'Test PC'"));
    }

    #[test]
    fn create_computer_quotes_hostile_description() {
        let script = create_computer(
            &NewComputer {
                name: "WS-01".to_string(),
                description: Some("x'; Remove-ADUser -Identity admin; '".to_string()),
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("'x''; Remove-ADUser -Identity admin; '''"));
    }

    #[test]
    fn create_computer_falls_back_to_session_ou() {
        let script = create_computer(
            &NewComputer {
                name: "WS-01".to_string(),
                ..Default::default()
            },
            Some("OU=Workstations,DC=corp,DC=example,DC=com"),
        );
        assert!(script.contains("$params['Path'] = 'OU=Workstations,DC=corp,DC=example,DC=com'"));
    }

    #[test]
    fn create_computer_appends_sam_dollar() {
        let script = create_computer(
            &NewComputer {
                name: "WS-01".to_string(),
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("SamAccountName = 'WS-01$'"));
    }

    #[test]
    fn create_user_membership_steps_are_best_effort() {
        let script = create_user(
            &NewUser {
                name: "John Doe".to_string(),
                sam_account_name: "jdoe".to_string(),
                groups: vec!["Helpdesk".to_string(), "VPN Users".to_string()],
                enabled: true,
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("STEP:ok group:Helpdesk"));
        assert!(script.contains("STEP:fail group:Helpdesk"));
        assert!(script.contains("Add-ADGroupMember -Identity 'VPN Users' -Members 'jdoe' @adArgs"));
        // Membership failures are caught inside the loop, not rethrown
        assert_eq!(script.matches("exit 1").count(), 1);
    }

    #[test]
    fn create_user_initial_password_comes_from_payload() {
        let script = create_user(
            &NewUser {
                name: "John Doe".to_string(),
                sam_account_name: "jdoe".to_string(),
                set_initial_password: true,
                change_password_at_logon: true,
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("$payload.initial_password"));
        assert!(script.contains("ChangePasswordAtLogon"));
        // The secret itself is never rendered into script text
        assert!(!script.contains("AccountPassword = '"));
    }

    #[test]
    fn create_group_renders_scope_and_category() {
        let script = create_group(
            &NewGroup {
                name: "App Owners".to_string(),
                scope: GroupScope::Universal,
                category: GroupCategory::Distribution,
                ..Default::default()
            },
            None,
        );
        assert!(script.contains("GroupScope = 'Universal'"));
        assert!(script.contains("GroupCategory = 'Distribution'"));
    }

    // ==================== Update scripts ====================

    #[test]
    fn update_allow_listed_fields_use_dedicated_parameters() {
        let script = update_user_field("jdoe", "Description", "new text").unwrap();
        assert!(script.contains("Set-ADUser -Identity 'jdoe' -Description 'new text' @adArgs"));

        let script = update_user_field("jdoe", "title", "Engineer").unwrap();
        assert!(script.contains("-Title 'Engineer'"));

        let script = update_computer_field("WS-01", "department", "IT").unwrap();
        assert!(script.contains("Set-ADComputer -Identity 'WS-01' -Department 'IT' @adArgs"));
    }

    #[test]
    fn update_other_fields_use_replace_hashtable() {
        let script = update_user_field("jdoe", "physicalDeliveryOfficeName", "HQ-3").unwrap();
        assert!(script.contains("-Replace @{ 'physicalDeliveryOfficeName' = 'HQ-3' }"));
    }

    #[test]
    fn update_rejects_malformed_attribute_names() {
        assert!(update_user_field("jdoe", "a b; Remove-Item", "x").is_err());
        assert!(update_user_field("jdoe", "", "x").is_err());
        assert!(update_user_field("jdoe", "1starts-with-digit", "x").is_err());
    }

    // ==================== Delete scripts ====================

    #[test]
    fn delete_checks_before_and_after() {
        let script = delete_computer("WS-01");
        let first_get = script.find("Get-ADComputer -Identity 'WS-01'").unwrap();
        let remove = script.find("Remove-ADComputer -Identity 'WS-01'").unwrap();
        let recheck = script.rfind("Get-ADComputer -Identity 'WS-01'").unwrap();
        assert!(first_get < remove && remove < recheck);
        assert!(script.contains("still present after deletion"));
    }

    // ==================== Toggle / reset scripts ====================

    #[test]
    fn enable_disable_select_cmdlet() {
        assert!(set_user_enabled("jdoe", true).contains("Enable-ADAccount -Identity 'jdoe'"));
        assert!(set_user_enabled("jdoe", false).contains("Disable-ADAccount -Identity 'jdoe'"));
    }

    #[test]
    fn reset_password_saves_and_restores_never_expires_flag() {
        let script = reset_password("jdoe", true);
        assert!(script.contains("STEP:ok clear-password-never-expires"));
        assert!(script.contains("STEP:ok restore-password-never-expires"));
        assert!(script.contains("STEP:ok change-at-next-logon"));
        assert!(script.contains("$payload.new_password"));
        // Clear must precede the reset, restore must follow it
        let clear = script.find("clear-password-never-expires").unwrap();
        let reset = script.find("Set-ADAccountPassword").unwrap();
        let restore = script.find("restore-password-never-expires").unwrap();
        assert!(clear < reset && reset < restore);
    }

    #[test]
    fn reset_password_without_force_change_omits_logon_step() {
        let script = reset_password("jdoe", false);
        assert!(!script.contains("change-at-next-logon"));
    }

    // ==================== Queries ====================

    #[test]
    fn list_users_without_filter_has_no_where_clause() {
        let script = list_users(None);
        assert!(!script.contains("Where-Object"));
        assert!(script.contains("ConvertTo-Json -Compress"));
    }

    #[test]
    fn list_users_filter_is_escaped() {
        let script = list_users(Some("ws*'"));
        assert!(script.contains("-like '*ws`*''*'"));
    }

    #[test]
    fn count_query_is_bare() {
        let script = count_objects("Get-ADUser");
        assert!(script.contains("@(Get-ADUser -Filter * @adArgs).Count"));
        assert!(!script.contains("ConvertTo-Json"));
    }

    // ==================== Machine scripts ====================

    #[test]
    fn remote_scripts_splat_credential_conditionally() {
        let script = list_disks("srv01");
        assert!(script.contains("$icArgs = @{ ComputerName = 'srv01' }"));
        assert!(script.contains("if ($cred) { $icArgs.Credential = $cred }"));
    }

    #[test]
    fn connectivity_script_emits_ok_sentinel() {
        let script = test_connectivity("srv01");
        assert!(script.contains("Test-WSMan -ComputerName 'srv01'"));
        assert!(script.contains("Write-Output 'OK'"));
    }

    #[test]
    fn delete_profile_quotes_sid() {
        let script = delete_profile("srv01", "S-1-5-21-1111-2222-3333-1001");
        assert!(script.contains("$_.SID -eq 'S-1-5-21-1111-2222-3333-1001'"));
        assert!(script.contains("Profile is currently loaded"));
    }
}
