pub(crate) const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS developers (
        username TEXT PRIMARY KEY NOT NULL,
        firstname TEXT NOT NULL DEFAULT '',
        lastname TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL DEFAULT '',
        password TEXT NOT NULL,
        passwordsalt TEXT NOT NULL,
        passworditerations INTEGER NOT NULL,
        isadmin INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS plugins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        shortdescription TEXT NOT NULL DEFAULT '',
        longdescription TEXT NOT NULL DEFAULT '',
        authornames TEXT NOT NULL DEFAULT '',
        authoremails TEXT NOT NULL DEFAULT '',
        authorinstitutes TEXT NOT NULL DEFAULT '',
        icon BLOB
    )",
    "CREATE TABLE IF NOT EXISTS sources (
        pluginid INTEGER NOT NULL,
        pluginversion INTEGER NOT NULL,
        buildversion INTEGER NOT NULL DEFAULT 0,
        zipfilename TEXT NOT NULL DEFAULT '',
        buildstate TEXT NOT NULL DEFAULT 'CREATED',
        buildlog TEXT NOT NULL DEFAULT '',
        assemblyfilename TEXT NOT NULL DEFAULT '',
        uploaddate TEXT,
        builddate TEXT,
        publishstate TEXT NOT NULL DEFAULT 'NOTPUBLISHED',
        PRIMARY KEY (pluginid, pluginversion)
    )",
    "CREATE TABLE IF NOT EXISTS resources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS resourcesdata (
        resourceid INTEGER NOT NULL,
        version INTEGER NOT NULL,
        datafilename TEXT NOT NULL DEFAULT '',
        uploaddate TEXT,
        publishstate TEXT NOT NULL DEFAULT 'NOTPUBLISHED',
        PRIMARY KEY (resourceid, version)
    )",
];

/// Placeholders for the publish state cascade. The longest cascade has four
/// states; shorter ones repeat their last state.
pub(crate) const CASCADE_PARAMS: [&str; 4] = ["@state0", "@state1", "@state2", "@state3"];
